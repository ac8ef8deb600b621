use floe_core::{AppError, AppResult, OperatorIdentity};
use floe_domain::{AuthorizationDecision, AuthorizedVia, Environment};
use tracing::{debug, warn};

/// Decides whether an operator may move artifacts into an environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationEngine;

impl AuthorizationEngine {
    /// Evaluates the environment rule, first match wins:
    /// no rule, listed operator, then first allowed group the operator holds.
    #[must_use]
    pub fn authorize(
        &self,
        operator: &str,
        operator_groups: &[String],
        environment: &Environment,
    ) -> AuthorizationDecision {
        let Some(rule) = environment.authorization() else {
            return AuthorizationDecision {
                passed: true,
                via: AuthorizedVia::NoConfig,
            };
        };

        if rule
            .allowed_operators
            .iter()
            .any(|allowed| allowed == operator)
        {
            return AuthorizationDecision {
                passed: true,
                via: AuthorizedVia::Operator(operator.to_owned()),
            };
        }

        if let Some(group) = rule
            .allowed_groups
            .iter()
            .find(|allowed| operator_groups.contains(allowed))
        {
            return AuthorizationDecision {
                passed: true,
                via: AuthorizedVia::Group(group.clone()),
            };
        }

        AuthorizationDecision {
            passed: false,
            via: AuthorizedVia::Denied,
        }
    }

    /// Authorizes the operator or returns [`AppError::Authorization`].
    pub fn require(
        &self,
        operator: &OperatorIdentity,
        environment: &Environment,
    ) -> AppResult<AuthorizationDecision> {
        let decision = self.authorize(operator.subject(), operator.groups(), environment);

        if let Some(rule) = environment.authorization()
            && rule.separation_of_duties
        {
            warn!(
                environment = environment.name(),
                operator = operator.subject(),
                "separation of duties is configured but artifact producer identity is unavailable; not enforced"
            );
        }

        if decision.passed {
            debug!(
                environment = environment.name(),
                operator = operator.subject(),
                via = %decision.via,
                "operator authorized"
            );
            return Ok(decision);
        }

        let (required_groups, allowed_operators) = environment
            .authorization()
            .map(|rule| (rule.allowed_groups.clone(), rule.allowed_operators.clone()))
            .unwrap_or_default();

        Err(AppError::Authorization {
            operator: operator.subject().to_owned(),
            environment: environment.name().to_owned(),
            reason: if operator.groups().is_empty() {
                "operator is not listed and belongs to no groups".to_owned()
            } else {
                format!(
                    "operator is not listed and none of its groups [{}] are allowed",
                    operator.groups().join(", ")
                )
            },
            required_groups,
            allowed_operators,
        })
    }
}
