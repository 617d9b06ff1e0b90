//! Wire-level structures for the authenticator ceremonies.
//!
//! Field names follow the browser credential API JSON encoding; binary values
//! (credential ids, attestation payloads) travel as base64url strings.

use serde::{Deserialize, Serialize};

/// Options handed to the browser to begin credential registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptions {
    pub challenge: String,
    pub rp: RpEntity,
    pub user: UserEntity,
    pub pub_key_cred_params: Vec<CredentialParameter>,
    pub timeout: u32,
    pub attestation: String,
    pub exclude_credentials: Vec<CredentialDescriptor>,
    pub authenticator_selection: AuthenticatorSelection,
}

/// Options handed to the browser to begin an authentication ceremony.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    pub challenge: String,
    pub timeout: u32,
    pub rp_id: String,
    pub allow_credentials: Vec<CredentialDescriptor>,
    pub user_verification: String,
}

/// The relying party as presented to the authenticator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpEntity {
    pub name: String,
    pub id: String,
}

/// The account as presented to the authenticator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

/// One acceptable signature algorithm, as a COSE identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialParameter {
    pub alg: i32,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Reference to an already-registered credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    /// base64url credential id
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    pub resident_key: String,
    pub user_verification: String,
}

/// The browser's answer to a registration ceremony.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: String,
    pub raw_id: String,
    pub response: AttestationResponse,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub attestation_object: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<String>>,
}

/// The browser's answer to an authentication ceremony.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    pub id: String,
    pub raw_id: String,
    pub response: AssertionResponse,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub authenticator_data: String,
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_options_use_browser_field_names() {
        let options = RegistrationOptions {
            challenge: "c".to_string(),
            rp: RpEntity {
                name: "App - dev".to_string(),
                id: "localhost".to_string(),
            },
            user: UserEntity {
                id: "1".to_string(),
                name: "alice".to_string(),
                display_name: "alice".to_string(),
            },
            pub_key_cred_params: vec![CredentialParameter {
                alg: -7,
                kind: "public-key".to_string(),
            }],
            timeout: 60_000,
            attestation: "none".to_string(),
            exclude_credentials: vec![CredentialDescriptor {
                id: "Y3JlZA".to_string(),
                kind: "public-key".to_string(),
                transports: None,
            }],
            authenticator_selection: AuthenticatorSelection {
                resident_key: "preferred".to_string(),
                user_verification: "preferred".to_string(),
            },
        };

        let json = serde_json::to_value(&options).unwrap();
        assert!(json.get("pubKeyCredParams").is_some());
        assert_eq!(json["pubKeyCredParams"][0]["type"], "public-key");
        assert_eq!(json["user"]["displayName"], "alice");
        assert!(json.get("excludeCredentials").is_some());
        assert_eq!(json["authenticatorSelection"]["residentKey"], "preferred");
        // Absent transports are omitted, not serialized as null.
        assert!(json["excludeCredentials"][0].get("transports").is_none());
    }

    #[test]
    fn responses_parse_browser_payloads() {
        let raw = serde_json::json!({
            "id": "Y3JlZA",
            "rawId": "Y3JlZA",
            "response": {
                "clientDataJSON": "eyJjaGFsbGVuZ2UiOiJjIn0",
                "attestationObject": "b2JqZWN0",
                "transports": ["usb", "nfc"]
            },
            "type": "public-key"
        });
        let parsed: RegistrationResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.raw_id, "Y3JlZA");
        assert_eq!(parsed.kind, "public-key");
        assert_eq!(
            parsed.response.transports.as_deref(),
            Some(["usb".to_string(), "nfc".to_string()].as_slice())
        );

        let raw = serde_json::json!({
            "id": "Y3JlZA",
            "rawId": "Y3JlZA",
            "response": {
                "clientDataJSON": "eyJjaGFsbGVuZ2UiOiJjIn0",
                "authenticatorData": "ZGF0YQ",
                "signature": "c2ln"
            },
            "type": "public-key"
        });
        let parsed: AuthenticationResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.response.signature, "c2ln");
        assert!(parsed.response.user_handle.is_none());
    }

    #[test]
    fn authentication_options_round_trip() {
        let options = AuthenticationOptions {
            challenge: "c".to_string(),
            timeout: 60_000,
            rp_id: "localhost".to_string(),
            allow_credentials: vec![],
            user_verification: "required".to_string(),
        };

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["rpId"], "localhost");
        assert_eq!(json["userVerification"], "required");
    }
}
