//! Request validation
//!
//! Checks the shape of a [`ProofRequest`] against the fixed per-type field
//! table. Validation is pure: it never touches the prover backend and never
//! echoes a private value back in its error.

use std::fmt;

use chrono::NaiveDate;

use crate::error::{Result, VeilError};
use crate::types::{ClaimType, ProofRequest, ProofSystem};

/// Where an offending field lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldScope {
    Claim,
    PrivateInputs,
}

impl fmt::Display for FieldScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldScope::Claim => f.write_str("claim"),
            FieldScope::PrivateInputs => f.write_str("privateInputs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    Missing,
    Malformed(&'static str),
    Unexpected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub scope: FieldScope,
    pub field: String,
    pub kind: IssueKind,
}

impl FieldIssue {
    /// `claim.minBalance`-style path
    pub fn path(&self) -> String {
        format!("{}.{}", self.scope, self.field)
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::Missing => write!(f, "{} is missing", self.path()),
            IssueKind::Malformed(expected) => {
                write!(f, "{} is malformed (expected {})", self.path(), expected)
            }
            IssueKind::Unexpected => write!(f, "{} is not a recognised field", self.path()),
        }
    }
}

/// Every problem found in one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub claim_type: ClaimType,
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn fields(&self) -> Vec<String> {
        self.issues.iter().map(FieldIssue::path).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} request: ", self.claim_type)?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// A request that passed validation. Immutable from here on.
#[derive(Debug)]
pub struct ValidatedRequest {
    request: ProofRequest,
    proof_system: Option<ProofSystem>,
}

impl ValidatedRequest {
    pub fn claim_type(&self) -> ClaimType {
        self.request.claim_type
    }

    /// The explicitly requested system, if any
    pub fn proof_system(&self) -> Option<ProofSystem> {
        self.proof_system
    }

    pub fn claim_value(&self, field: &str) -> Option<&str> {
        self.request.claim.get(field).map(String::as_str)
    }

    pub(crate) fn private_inputs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.request
            .private_inputs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Public inputs: the claim's required fields in table order
    pub fn public_inputs(&self) -> Vec<String> {
        self.request
            .claim_type
            .claim_fields()
            .iter()
            .filter_map(|field| self.request.claim.get(*field).cloned())
            .collect()
    }
}

pub struct RequestValidator;

impl RequestValidator {
    pub fn validate(request: ProofRequest) -> Result<ValidatedRequest> {
        let claim_type = request.claim_type;
        let mut issues = Vec::new();

        for field in claim_type.claim_fields() {
            check_field(
                &mut issues,
                FieldScope::Claim,
                field,
                request.claim.get(*field).map(String::as_str),
                true,
            );
        }
        for key in request.claim.keys() {
            if !claim_type.claim_fields().contains(&key.as_str()) {
                issues.push(FieldIssue {
                    scope: FieldScope::Claim,
                    field: key.clone(),
                    kind: IssueKind::Unexpected,
                });
            }
        }

        for field in claim_type.required_private_fields() {
            check_field(
                &mut issues,
                FieldScope::PrivateInputs,
                field,
                request.private_inputs.get(*field).map(String::as_str),
                true,
            );
        }
        for field in claim_type.optional_private_fields() {
            check_field(
                &mut issues,
                FieldScope::PrivateInputs,
                field,
                request.private_inputs.get(*field).map(String::as_str),
                false,
            );
        }

        if !issues.is_empty() {
            tracing::debug!(
                claim_type = %claim_type,
                issues = issues.len(),
                "proof request rejected"
            );
            return Err(ValidationError { claim_type, issues }.into());
        }

        let proof_system = request
            .proof_system
            .as_deref()
            .map(str::parse::<ProofSystem>)
            .transpose()?;

        Ok(ValidatedRequest {
            request,
            proof_system,
        })
    }
}

fn check_field(
    issues: &mut Vec<FieldIssue>,
    scope: FieldScope,
    field: &str,
    value: Option<&str>,
    required: bool,
) {
    let kind = match value.map(str::trim) {
        None | Some("") if required => Some(IssueKind::Missing),
        None | Some("") => None,
        Some(v) => {
            let rule = FieldRule::for_field(field);
            (!rule.accepts(v)).then(|| IssueKind::Malformed(rule.expected()))
        }
    };

    if let Some(kind) = kind {
        issues.push(FieldIssue {
            scope,
            field: field.to_string(),
            kind,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldRule {
    Decimal,
    Integer,
    PositiveInteger,
    TxHash,
    HexAddress,
    Date,
    CountryCode,
    NonEmpty,
}

impl FieldRule {
    fn for_field(field: &str) -> Self {
        match field {
            "minBalance" | "actualBalance" => FieldRule::Decimal,
            "ageOver" | "kycLevel" => FieldRule::Integer,
            "chainId" => FieldRule::PositiveInteger,
            "txHash" => FieldRule::TxHash,
            "address" => FieldRule::HexAddress,
            "dateOfBirth" => FieldRule::Date,
            "country" => FieldRule::CountryCode,
            _ => FieldRule::NonEmpty,
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            FieldRule::Decimal => "a non-negative decimal",
            FieldRule::Integer => "a non-negative integer",
            FieldRule::PositiveInteger => "a positive integer",
            FieldRule::TxHash => "0x followed by 64 hex digits",
            FieldRule::HexAddress => "0x-prefixed hex",
            FieldRule::Date => "a YYYY-MM-DD date",
            FieldRule::CountryCode => "a two-letter country code",
            FieldRule::NonEmpty => "a non-empty value",
        }
    }

    fn accepts(&self, value: &str) -> bool {
        match self {
            FieldRule::Decimal => parse_decimal(value).is_some(),
            FieldRule::Integer => value.parse::<u64>().is_ok(),
            FieldRule::PositiveInteger => value.parse::<u64>().map_or(false, |n| n > 0),
            FieldRule::TxHash => value
                .strip_prefix("0x")
                .map_or(false, |h| h.len() == 64 && h.bytes().all(|b| b.is_ascii_hexdigit())),
            FieldRule::HexAddress => value.strip_prefix("0x").map_or(false, |h| {
                !h.is_empty() && h.len() <= 64 && h.bytes().all(|b| b.is_ascii_hexdigit())
            }),
            FieldRule::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
            FieldRule::CountryCode => {
                value.len() == 2 && value.bytes().all(|b| b.is_ascii_alphabetic())
            }
            FieldRule::NonEmpty => !value.trim().is_empty(),
        }
    }
}

/// Parse a non-negative decimal string into (digits, scale)
pub(crate) fn parse_decimal(value: &str) -> Option<(u128, u32)> {
    let (int_part, frac_part) = match value.split_once('.') {
        Some((i, f)) => (i, f),
        None => (value, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    if value.ends_with('.') || frac_part.len() > 18 {
        return None;
    }

    let digits = format!("{int_part}{frac_part}");
    let mantissa = if digits.is_empty() { 0 } else { digits.parse::<u128>().ok()? };
    Some((mantissa, frac_part.len() as u32))
}

/// `a >= b` for two decimal strings, `None` if either is malformed
pub(crate) fn decimal_at_least(a: &str, b: &str) -> Option<bool> {
    let (ma, sa) = parse_decimal(a)?;
    let (mb, sb) = parse_decimal(b)?;
    let scale = sa.max(sb);
    let ma = ma.checked_mul(10u128.checked_pow(scale - sa)?)?;
    let mb = mb.checked_mul(10u128.checked_pow(scale - sb)?)?;
    Some(ma >= mb)
}
