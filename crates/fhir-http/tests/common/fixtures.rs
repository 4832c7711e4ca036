//! Test fixtures for adapter testing.
//!
//! Provides predefined FHIR resources for use in tests.

use serde_json::{Value, json};

/// A patient without id or meta, as a client would create it.
pub fn new_patient(family: &str) -> Value {
    json!({
        "resourceType": "Patient",
        "name": [{ "family": family }],
        "active": true
    })
}

/// A patient with the given id, as a client would send it in an update.
pub fn patient_with_id(id: &str, family: &str) -> Value {
    json!({
        "resourceType": "Patient",
        "id": id,
        "name": [{ "family": family }],
        "active": true
    })
}

/// An observation referencing a patient.
pub fn observation(patient_id: &str, code: &str) -> Value {
    json!({
        "resourceType": "Observation",
        "status": "final",
        "code": {
            "coding": [{ "system": "http://loinc.org", "code": code }]
        },
        "subject": { "reference": format!("Patient/{}", patient_id) }
    })
}

/// A small PNG signature, used as Binary content.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
