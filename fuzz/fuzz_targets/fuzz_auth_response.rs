//! Fuzz testing for identity service response handling.
//!
//! Feeds arbitrary status codes and bodies through `interpret_response` and,
//! when a body decodes, through `project_identity` and header application.
//! Neither may panic, whatever the identity service sends back.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_auth_response -- -max_total_time=60
//! ```

#![no_main]

use arbitrary::Arbitrary;
use http::{HeaderMap, StatusCode};
use keystone_auth::keystone::interpret_response;
use keystone_auth::middleware::headers::apply_identity_headers;
use keystone_auth::middleware::{project_identity, strip_identity_headers};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    status: u16,
    body: &'a [u8],
}

fuzz_target!(|input: Input<'_>| {
    let Ok(status) = StatusCode::from_u16(input.status) else {
        return;
    };

    let Ok(identity) = interpret_response(status, input.body) else {
        return;
    };

    // Only a 200 can ever produce an identity
    assert_eq!(status, StatusCode::OK);

    let projected = project_identity(&identity);
    assert_eq!(projected, project_identity(&identity));

    let mut headers = HeaderMap::new();
    apply_identity_headers(&mut headers, projected);
    strip_identity_headers(&mut headers);
    assert!(headers.is_empty());
});
