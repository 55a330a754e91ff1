use compta_domain::{AccountId, DomainError, EntryId, TemplateId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("Entry identifier already in use: {0}")]
    DuplicateEntry(EntryId),
    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),
    #[error("Entry has no identifier")]
    MissingId,
    #[error("No entry identifiers left to assign")]
    IdsExhausted,
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),
    #[error("Account identifier already in use: {0}")]
    DuplicateAccount(AccountId),
    #[error("Template identifier already in use: {0}")]
    DuplicateTemplate(TemplateId),
    #[error("Template {template} depends on unknown template {dependency}")]
    MissingDependency {
        template: TemplateId,
        dependency: TemplateId,
    },
    #[error("Recurring templates form a dependency cycle: {0:?}")]
    DependencyCycle(Vec<TemplateId>),
}

impl CoreError {
    /// Referential and dependency failures abort a whole pass; identity
    /// failures only concern the single call.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            CoreError::AccountNotFound(_)
                | CoreError::MissingDependency { .. }
                | CoreError::DependencyCycle(_)
        )
    }
}
