//! One-shot constructors for the common message shapes.
//!
//! Thin wrappers that build the right transport, seal it, and project the
//! natural sidecar for that shape when the caller opts into visibility.
//! Integrators that need extensions or custom sidecar policies use
//! [`Hpke::seal`] directly.

use serde_json::{json, Value};

use crate::envelope::{Envelope, Hpke, SealOptions};
use crate::keys::Jwk;
use crate::sidecar::{PublicEntities, Sidecar};
use crate::transport::{SecureTransport, HEADER_X_PAYMENT, HEADER_X_PAYMENT_RESPONSE};
use crate::Result;

fn seal_shape(
    hpke: &Hpke,
    kid: &str,
    recipient_public_jwk: &Jwk,
    transport: &SecureTransport,
    public: Option<PublicEntities>,
) -> Result<(Envelope, Option<Sidecar>)> {
    let options = SealOptions {
        make_entities_public: public,
        make_entities_private: Vec::new(),
    };
    hpke.seal(kid, recipient_public_jwk, transport, &options)
}

/// Seal a payment submission. `payment_data` becomes the `payload` of the
/// `X-Payment` header; `is_public` projects that header into the sidecar.
pub fn create_payment(
    hpke: &Hpke,
    payment_data: &Value,
    recipient_public_jwk: &Jwk,
    kid: &str,
    is_public: bool,
) -> Result<(Envelope, Option<Sidecar>)> {
    let transport = SecureTransport::payment(json!({ "payload": payment_data }), vec![])?;
    let public = is_public.then(|| PublicEntities::Names(vec![HEADER_X_PAYMENT.to_string()]));
    seal_shape(hpke, kid, recipient_public_jwk, &transport, public)
}

/// Seal a settlement confirmation carried in the `X-Payment-Response` header.
pub fn create_payment_response(
    hpke: &Hpke,
    settlement_data: &Value,
    recipient_public_jwk: &Jwk,
    kid: &str,
    is_public: bool,
) -> Result<(Envelope, Option<Sidecar>)> {
    let transport = SecureTransport::payment_response(settlement_data.clone(), vec![])?;
    let public =
        is_public.then(|| PublicEntities::Names(vec![HEADER_X_PAYMENT_RESPONSE.to_string()]));
    seal_shape(hpke, kid, recipient_public_jwk, &transport, public)
}

/// Seal a 402 Payment Required quote. With `is_public`, the quote body is
/// projected; core payment headers are always suppressed at 402.
pub fn create_payment_required(
    hpke: &Hpke,
    payment_required_data: &Value,
    recipient_public_jwk: &Jwk,
    kid: &str,
    is_public: bool,
) -> Result<(Envelope, Option<Sidecar>)> {
    let transport = SecureTransport::payment_required(payment_required_data.clone(), vec![])?;
    let public = is_public.then_some(PublicEntities::All);
    seal_shape(hpke, kid, recipient_public_jwk, &transport, public)
}

/// Seal a generic request. Requests are private; there is no natural sidecar.
pub fn create_request(
    hpke: &Hpke,
    request_data: &Value,
    recipient_public_jwk: &Jwk,
    kid: &str,
) -> Result<(Envelope, Option<Sidecar>)> {
    let transport = SecureTransport::request(request_data.clone(), vec![])?;
    seal_shape(hpke, kid, recipient_public_jwk, &transport, None)
}

/// Seal a generic response with its HTTP status code.
pub fn create_response(
    hpke: &Hpke,
    response_data: &Value,
    http_response_code: u16,
    recipient_public_jwk: &Jwk,
    kid: &str,
) -> Result<(Envelope, Option<Sidecar>)> {
    let transport = SecureTransport::response(response_data.clone(), http_response_code, vec![])?;
    seal_shape(hpke, kid, recipient_public_jwk, &transport, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::OpenOptions;
    use crate::keys::generate_keypair;
    use serde_json::json;

    fn hpke() -> Hpke {
        Hpke::new("myapp").unwrap()
    }

    #[test]
    fn payment_is_private_by_default() {
        let (public, private) = generate_keypair();
        let (envelope, sidecar) =
            create_payment(&hpke(), &json!({"invoiceId": "inv_1"}), &public, "kid1", false)
                .unwrap();
        assert!(sidecar.is_none());

        let opened = hpke()
            .open(&private, &envelope, &OpenOptions::default())
            .unwrap();
        assert_eq!(opened.plaintext, b"{}");
        assert_eq!(opened.headers[0].name, HEADER_X_PAYMENT);
        assert_eq!(opened.headers[0].value["payload"]["invoiceId"], "inv_1");
    }

    #[test]
    fn public_payment_projects_the_header() {
        let (public, private) = generate_keypair();
        let (envelope, sidecar) =
            create_payment(&hpke(), &json!({"invoiceId": "inv_1"}), &public, "kid1", true)
                .unwrap();
        let sidecar = sidecar.unwrap();
        assert!(sidecar.headers.contains_key("X-PAYMENT"));

        let options = OpenOptions {
            public_headers: Some(&sidecar.headers),
            ..OpenOptions::default()
        };
        hpke().open(&private, &envelope, &options).unwrap();
    }

    #[test]
    fn public_payment_response_projects_the_header() {
        let (public, _) = generate_keypair();
        let (_, sidecar) = create_payment_response(
            &hpke(),
            &json!({"settlementId": "settle_1"}),
            &public,
            "kid1",
            true,
        )
        .unwrap();
        assert!(sidecar.unwrap().headers.contains_key("X-PAYMENT-RESPONSE"));
    }

    #[test]
    fn payment_required_projects_body_not_headers() {
        let (public, private) = generate_keypair();
        let (envelope, sidecar) = create_payment_required(
            &hpke(),
            &json!({"cost": "1000", "currency": "USD"}),
            &public,
            "kid1",
            true,
        )
        .unwrap();
        let sidecar = sidecar.unwrap();
        assert!(sidecar.headers.is_empty());
        assert_eq!(sidecar.body.as_ref().unwrap()["cost"], "1000");

        let options = OpenOptions {
            public_body: sidecar.body.as_ref(),
            ..OpenOptions::default()
        };
        let opened = hpke().open(&private, &envelope, &options).unwrap();
        assert_eq!(opened.body["currency"], "USD");
    }

    #[test]
    fn request_and_response_round_trip() {
        let (public, private) = generate_keypair();

        let (envelope, sidecar) = create_request(
            &hpke(),
            &json!({"action": "getData", "params": {"id": 123}}),
            &public,
            "kid1",
        )
        .unwrap();
        assert!(sidecar.is_none());
        let opened = hpke()
            .open(&private, &envelope, &OpenOptions::default())
            .unwrap();
        assert_eq!(opened.body["action"], "getData");

        let (envelope, sidecar) = create_response(
            &hpke(),
            &json!({"status": "success"}),
            200,
            &public,
            "kid1",
        )
        .unwrap();
        assert!(sidecar.is_none());
        let opened = hpke()
            .open(&private, &envelope, &OpenOptions::default())
            .unwrap();
        assert_eq!(opened.body["status"], "success");
    }
}
