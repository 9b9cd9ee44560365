//! Enrollment and verification flows.
//!
//! Both services are stateless between calls: everything they hold is an
//! injected collaborator, and all persistent state lives in the
//! [`TemplateStore`]. They can be shared across threads behind an `Arc`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::collaborator::Extractor;
use crate::error::{Error, Result, UpstreamError};
use crate::identity::{Identity, IdentityCase};
use crate::matcher::{MatchPolicy, MatchResult};
use crate::storage::TemplateStore;

/// What enrolling an identity that already has a template does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reenrollment {
    /// Last write wins: the new template replaces the old one.
    #[default]
    Overwrite,
    /// Fail with [`Error::AlreadyEnrolled`] and keep the old template.
    Reject,
}

/// Confirmation of a successful enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrolled {
    pub identity: Identity,
    /// Whether a previous template was overwritten.
    pub replaced: bool,
}

/// Outcome of a verification that ran to completion.
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    Decided(MatchResult),
    /// No template is stored for the identity. This is distinct from a
    /// capture that was scored and did not match.
    NotEnrolled(Identity),
}

impl Verification {
    pub fn is_match(&self) -> bool {
        matches!(self, Verification::Decided(result) if result.matched)
    }
}

pub struct EnrollmentService {
    extractor: Extractor,
    store: Arc<dyn TemplateStore>,
    identity_case: IdentityCase,
    reenrollment: Reenrollment,
}

impl EnrollmentService {
    pub fn new(extractor: Extractor, store: Arc<dyn TemplateStore>) -> Self {
        Self {
            extractor,
            store,
            identity_case: IdentityCase::default(),
            reenrollment: Reenrollment::default(),
        }
    }

    pub fn with_identity_case(mut self, case: IdentityCase) -> Self {
        self.identity_case = case;
        self
    }

    pub fn with_reenrollment(mut self, policy: Reenrollment) -> Self {
        self.reenrollment = policy;
        self
    }

    /// Derive an embedding from `raw_image` and bind it to `identity`.
    ///
    /// The store is touched only after the embedding was derived, and at
    /// most once.
    pub fn enroll(&self, identity: &str, raw_image: &[u8]) -> Result<Enrolled> {
        let identity = Identity::parse(identity, self.identity_case)?;
        let embedding = self.extractor.extract(raw_image)?;

        let replaced = match self.reenrollment {
            Reenrollment::Overwrite => self.store.put(&identity, &embedding)?,
            Reenrollment::Reject => {
                if !self.store.put_if_absent(&identity, &embedding)? {
                    log::warn!("Refusing to re-enroll {}", identity);
                    return Err(Error::AlreadyEnrolled(identity));
                }
                false
            }
        };

        if replaced {
            log::info!("Replaced template for {}", identity);
        } else {
            log::info!("Enrolled {}", identity);
        }
        Ok(Enrolled { identity, replaced })
    }
}

pub struct VerificationService {
    extractor: Extractor,
    store: Arc<dyn TemplateStore>,
    policy: MatchPolicy,
    identity_case: IdentityCase,
}

impl VerificationService {
    pub fn new(extractor: Extractor, store: Arc<dyn TemplateStore>, policy: MatchPolicy) -> Self {
        Self {
            extractor,
            store,
            policy,
            identity_case: IdentityCase::default(),
        }
    }

    pub fn with_identity_case(mut self, case: IdentityCase) -> Self {
        self.identity_case = case;
        self
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Compare `raw_image` against the template stored for `identity`.
    /// Never mutates the store.
    pub fn verify(&self, identity: &str, raw_image: &[u8]) -> Result<Verification> {
        self.verify_with(identity, || Ok(raw_image))
    }

    /// Like [`VerificationService::verify`], but the image is only fetched
    /// once a template is known to exist. An unknown identity is reported as
    /// [`Verification::NotEnrolled`] without calling `load_image`.
    pub fn verify_with<F, B>(&self, identity: &str, load_image: F) -> Result<Verification>
    where
        F: FnOnce() -> std::result::Result<B, UpstreamError>,
        B: AsRef<[u8]>,
    {
        let identity = Identity::parse(identity, self.identity_case)?;

        let Some(template) = self.store.get(&identity)? else {
            log::warn!("No template enrolled for {}", identity);
            return Ok(Verification::NotEnrolled(identity));
        };

        let raw_image = load_image()?;
        let capture = self.extractor.extract(raw_image.as_ref())?;
        let result = self.policy.evaluate(&template, &capture)?;
        log::info!(
            "Match result for {}: {} (similarity {:.4}, threshold {:.4})",
            identity,
            result.matched,
            result.similarity,
            self.policy.threshold()
        );

        Ok(Verification::Decided(result))
    }
}
