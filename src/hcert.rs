//! EU Digital COVID Certificate payload (`hcert` claim, key 1).
//!
//! Structural rules are enforced while decoding: a certificate that breaks
//! one of them is never returned.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Schema version from which exactly one event is required.
const SINGLE_EVENT_SINCE: (u32, u32, u32) = (1, 3, 0);

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PersonName {
    #[serde(rename = "fn")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// Standardised (ICAO 9303 transliterated) family name.
    #[serde(rename = "fnt")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name_std: Option<String>,
    #[serde(rename = "gn")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(rename = "gnt")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name_std: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Vaccination {
    pub tg: String,
    pub vp: String,
    pub mp: String,
    pub ma: String,
    /// Dose number.
    pub dn: i64,
    /// Total series of doses.
    pub sd: i64,
    pub dt: String,
    pub co: String,
    #[serde(rename = "is")]
    pub issuer: String,
    pub ci: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Test {
    pub tg: String,
    pub tt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ma: Option<String>,
    /// Sample collection date-time.
    pub sc: String,
    pub tr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tc: Option<String>,
    pub co: String,
    #[serde(rename = "is")]
    pub issuer: String,
    pub ci: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Recovery {
    pub tg: String,
    /// Date of first positive test.
    pub fr: String,
    /// Valid from.
    pub df: String,
    /// Valid until.
    pub du: String,
    pub co: String,
    #[serde(rename = "is")]
    pub issuer: String,
    pub ci: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HealthCertificate {
    #[serde(rename = "ver")]
    pub version: String,
    #[serde(rename = "nam")]
    pub name: PersonName,
    #[serde(rename = "dob")]
    pub date_of_birth: String,
    #[serde(rename = "v")]
    #[serde(skip_serializing_if = "Option::is_none")]
    vaccinations: Option<Vec<Vaccination>>,
    #[serde(rename = "t")]
    #[serde(skip_serializing_if = "Option::is_none")]
    tests: Option<Vec<Test>>,
    #[serde(rename = "r")]
    #[serde(skip_serializing_if = "Option::is_none")]
    recoveries: Option<Vec<Recovery>>,
}

impl HealthCertificate {
    /// Decode the certificate from its CBOR value and check every structural
    /// rule.
    pub fn from_cbor(value: &ciborium::value::Value) -> Result<Self, Error> {
        let cert: HealthCertificate = value
            .deserialized()
            .map_err(|e| Error::InvariantViolated(format!("malformed certificate: {}", e)))?;
        cert.validate()?;
        Ok(cert)
    }

    pub fn vaccinations(&self) -> &[Vaccination] {
        self.vaccinations.as_deref().unwrap_or_default()
    }

    pub fn tests(&self) -> &[Test] {
        self.tests.as_deref().unwrap_or_default()
    }

    pub fn recoveries(&self) -> &[Recovery] {
        self.recoveries.as_deref().unwrap_or_default()
    }

    /// Certificate identifier of the first event, used for revocation lookups.
    pub fn certificate_id(&self) -> Option<&str> {
        self.vaccinations()
            .iter()
            .map(|v| v.ci.as_str())
            .chain(self.tests().iter().map(|t| t.ci.as_str()))
            .chain(self.recoveries().iter().map(|r| r.ci.as_str()))
            .next()
    }

    pub fn validate(&self) -> Result<(), Error> {
        match &self.name.family_name_std {
            Some(name) if !name.is_empty() => {}
            _ => return Err(violation("standardised family name (nam.fnt) missing")),
        }
        check_partial_date("dob", &self.date_of_birth)?;

        let lists = [
            ("v", self.vaccinations().len()),
            ("t", self.tests().len()),
            ("r", self.recoveries().len()),
        ];
        let populated: Vec<&str> = lists
            .iter()
            .filter(|(_, len)| *len > 0)
            .map(|(name, _)| *name)
            .collect();
        if populated.len() > 1 {
            return Err(violation(format!(
                "event lists {} are mutually exclusive",
                populated.join(", ")
            )));
        }
        if parse_version(&self.version)? >= SINGLE_EVENT_SINCE {
            let total: usize = lists.iter().map(|(_, len)| len).sum();
            if total != 1 {
                return Err(violation(format!(
                    "version {} requires exactly one event, found {}",
                    self.version, total
                )));
            }
        }

        for v in self.vaccinations() {
            check_dose("v.dn", v.dn)?;
            check_dose("v.sd", v.sd)?;
            check_date("v.dt", &v.dt)?;
        }
        for t in self.tests() {
            check_date_time("t.sc", &t.sc)?;
        }
        for r in self.recoveries() {
            check_date("r.fr", &r.fr)?;
            check_date("r.df", &r.df)?;
            check_date("r.du", &r.du)?;
        }
        Ok(())
    }
}

fn violation(message: impl Into<String>) -> Error {
    Error::InvariantViolated(message.into())
}

fn parse_version(version: &str) -> Result<(u32, u32, u32), Error> {
    let mut parts = version.split('.').map(str::parse::<u32>);
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(Ok(major)), Some(Ok(minor)), Some(Ok(patch)), None) => Ok((major, minor, patch)),
        (Some(Ok(major)), Some(Ok(minor)), None, None) => Ok((major, minor, 0)),
        _ => Err(violation(format!("invalid schema version {:?}", version))),
    }
}

fn check_dose(field: &str, value: i64) -> Result<(), Error> {
    if !(1..=9).contains(&value) {
        return Err(violation(format!("{} = {} outside [1, 9]", field, value)));
    }
    Ok(())
}

fn check_date(field: &str, value: &str) -> Result<(), Error> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|e| violation(format!("{} {:?} is not a date: {}", field, value, e)))
}

fn check_date_time(field: &str, value: &str) -> Result<(), Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|_| ())
        .map_err(|e| violation(format!("{} {:?} is not a date-time: {}", field, value, e)))
}

/// Date of birth may be `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, or empty when unknown.
fn check_partial_date(field: &str, value: &str) -> Result<(), Error> {
    let ok = match value.len() {
        0 => true,
        4 => value.bytes().all(|b| b.is_ascii_digit()),
        7 => NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d").is_ok(),
        10 => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
        _ => false,
    };
    if !ok {
        return Err(violation(format!("{} {:?} is not a date", field, value)));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn vaccination_json() -> serde_json::Value {
        json!({
            "ver": "1.3.0",
            "nam": {"fn": "Musterfrau", "fnt": "MUSTERFRAU", "gn": "Erika", "gnt": "ERIKA"},
            "dob": "1964-08-12",
            "v": [{
                "tg": "840539006", "vp": "1119349007", "mp": "EU/1/20/1528",
                "ma": "ORG-100030215", "dn": 2, "sd": 2, "dt": "2021-05-29",
                "co": "DE", "is": "Robert Koch-Institut",
                "ci": "URN:UVCI:01DE/IZ12345A/5CWLU12RNOB9RXSEOP6FG8#W"
            }]
        })
    }

    fn test_event() -> serde_json::Value {
        json!({
            "tg": "840539006", "tt": "LP6464-4", "sc": "2021-05-29T10:00:00Z",
            "tr": "260415000", "co": "DE", "is": "RKI", "ci": "URN:UVCI:01DE/T1"
        })
    }

    fn decode(value: serde_json::Value) -> Result<HealthCertificate, Error> {
        HealthCertificate::from_cbor(&ciborium::value::Value::serialized(&value).unwrap())
    }

    fn expect_violation(result: Result<HealthCertificate, Error>) {
        match result {
            Err(Error::InvariantViolated(_)) => {}
            other => panic!("expected invariant violation, got {:?}", other),
        }
    }

    #[test]
    fn valid_vaccination() {
        let cert = decode(vaccination_json()).unwrap();
        assert_eq!(cert.vaccinations().len(), 1);
        assert!(cert.tests().is_empty());
        assert_eq!(
            cert.certificate_id(),
            Some("URN:UVCI:01DE/IZ12345A/5CWLU12RNOB9RXSEOP6FG8#W")
        );
        assert_eq!(cert.name.family_name_std.as_deref(), Some("MUSTERFRAU"));
    }

    #[test]
    fn vaccination_and_test_are_exclusive() {
        let mut value = vaccination_json();
        value["t"] = json!([test_event()]);
        expect_violation(decode(value.clone()));
        // Older schemas still forbid mixing event kinds.
        value["ver"] = json!("1.0.0");
        expect_violation(decode(value));
    }

    #[test]
    fn dose_number_range() {
        for dn in [0, 10, -1] {
            let mut value = vaccination_json();
            value["v"][0]["dn"] = json!(dn);
            expect_violation(decode(value));
        }
        let mut value = vaccination_json();
        value["v"][0]["dn"] = json!(9);
        value["v"][0]["sd"] = json!(9);
        decode(value).unwrap();
    }

    #[test]
    fn single_event_required_from_1_3() {
        let mut value = vaccination_json();
        value.as_object_mut().unwrap().remove("v");
        expect_violation(decode(value.clone()));
        value["ver"] = json!("1.2.1");
        decode(value).unwrap();

        let mut value = vaccination_json();
        let event = value["v"][0].clone();
        value["v"] = json!([event.clone(), event]);
        expect_violation(decode(value));
    }

    #[test]
    fn family_name_and_dates() {
        let mut value = vaccination_json();
        value["nam"].as_object_mut().unwrap().remove("fnt");
        expect_violation(decode(value));

        for dob in ["1964", "1964-08", ""] {
            let mut value = vaccination_json();
            value["dob"] = json!(dob);
            decode(value).unwrap();
        }
        let mut value = vaccination_json();
        value["dob"] = json!("12.08.1964");
        expect_violation(decode(value));

        let mut value = vaccination_json();
        value["v"][0]["dt"] = json!("2021-13-01");
        expect_violation(decode(value));
    }

    #[test]
    fn test_event_date_time() {
        let mut value = vaccination_json();
        value.as_object_mut().unwrap().remove("v");
        value["t"] = json!([test_event()]);
        let cert = decode(value.clone()).unwrap();
        assert_eq!(cert.certificate_id(), Some("URN:UVCI:01DE/T1"));

        value["t"][0]["sc"] = json!("2021-05-29");
        expect_violation(decode(value));
    }
}
