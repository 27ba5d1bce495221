use crate::types::Caller;

/// Supplies the acting account for the current call.
///
/// The identity is trusted as given. Any claim about its relation to a
/// group is not: privileged paths re-derive that from group state.
pub trait IdentityProvider: Send + Sync {
    /// `None` for an anonymous visitor.
    fn current_caller(&self) -> Option<Caller>;
}

/// Fixed identity, e.g. one resolved once per request by a web layer.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    caller: Option<Caller>,
}

impl StaticIdentity {
    pub fn signed_in(caller: Caller) -> Self {
        Self {
            caller: Some(caller),
        }
    }

    pub fn anonymous() -> Self {
        Self { caller: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_caller(&self) -> Option<Caller> {
        self.caller.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Identity;

    #[test]
    fn static_identity() {
        let caller = Caller::new(Identity::parse("reader-9").unwrap(), "Reader Nine");
        assert_eq!(StaticIdentity::signed_in(caller.clone()).current_caller(), Some(caller));
        assert_eq!(StaticIdentity::anonymous().current_caller(), None);
    }
}
