//! Role capability resolution.
//!
//! Resolved once per controller session; rendering code only ever asks the
//! resulting `Capabilities`, never the gateway. The backend stays
//! authoritative for enforcement regardless of what is exposed here.

use console_core::gateway::RoleGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorRole {
    Admin,
    Supervisor,
    Operator,
    DeliveryDriver,
}

impl OperatorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "administrador",
            Self::Supervisor => "supervisor",
            Self::Operator => "operador",
            Self::DeliveryDriver => "repartidor",
        }
    }

    fn is_privileged(&self) -> bool {
        matches!(self, Self::Admin | Self::Supervisor)
    }
}

/// Module key the auth service uses for the collections screens.
pub const PAYMENTS_MODULE: &str = "cobranzas";

#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    pub amend_payments: bool,
    pub void_payments: bool,
}

impl Capabilities {
    pub fn none() -> Self {
        Self::default()
    }

    /// One role-gate query per session. Non-privileged roles short-circuit
    /// without a remote call; a gate failure for a privileged role degrades
    /// to the local role check.
    pub async fn resolve(gate: &dyn RoleGateway, role: OperatorRole) -> Self {
        if !role.is_privileged() {
            return Self::none();
        }

        let exposed = match gate.role_modules(role.as_str()).await {
            Ok(modules) => modules.iter().any(|m| m == PAYMENTS_MODULE),
            Err(e) => {
                tracing::warn!(
                    role = role.as_str(),
                    error = %e,
                    "role module lookup failed, falling back to role check"
                );
                true
            }
        };

        Self {
            amend_payments: exposed,
            void_payments: exposed,
        }
    }
}
