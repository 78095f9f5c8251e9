use crate::domain::ports::AdminPolicy;
use std::collections::HashSet;

/// Admin policy backed by a fixed set of identities, built once at startup
/// from configuration rather than read from ambient process state.
#[derive(Debug, Default, Clone)]
pub struct StaticAdminPolicy {
    admins: HashSet<String>,
}

impl StaticAdminPolicy {
    pub fn new(admins: impl IntoIterator<Item = String>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }
}

impl AdminPolicy for StaticAdminPolicy {
    fn is_admin(&self, identity: &str) -> bool {
        self.admins.contains(identity)
    }
}
