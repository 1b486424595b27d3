use crate::error::ApiError;

use super::capabilities::Capabilities;
use super::classifier::ClassifiedRequest;
use super::gate::Tier;

/// Determine which action a classified request invokes, first match wins:
///
/// 1. explicit action in the URL path
/// 2. explicit action in the query parameter
/// 3. the verb-to-action mapping
/// 4. the declared default action
/// 5. otherwise 400 with the allowed-action list and a usage hint
///
/// URL and query overrides deliberately outrank the verb convention so that
/// several actions sharing one HTTP verb stay individually reachable.
/// Protected actions additionally require an admin-tier key.
pub fn resolve(
    request: &ClassifiedRequest,
    caps: &Capabilities,
    tier: Tier,
) -> Result<String, ApiError> {
    let action = if let Some(action) = &request.action_from_url {
        require_allowed(action, caps)?
    } else if let Some(action) = &request.action_from_query {
        require_allowed(action, caps)?
    } else if let Some(mapped) = caps.action_for_verb(&request.verb) {
        // Defensive re-check: a mapping pointing outside the allowed set is
        // a declaration inconsistency, not a client error we can act on.
        if !caps.is_allowed(mapped) {
            return Err(ApiError::forbidden_with_actions(
                format!(
                    "Verb mapping for {} is inconsistent with the allowed actions",
                    request.verb
                ),
                caps.allowed_list(),
            ));
        }
        mapped.to_string()
    } else if let Some(default) = caps.default_action() {
        default.to_string()
    } else {
        return Err(ApiError::bad_request_with_hints(
            "No action could be resolved for this request",
            caps.allowed_list(),
            "specify an action via /<resource>/<action> or ?action=<name>",
        ));
    };

    if caps.is_protected(&action) && tier != Tier::Admin {
        return Err(ApiError::forbidden(format!(
            "Action '{}' requires an admin API key",
            action
        )));
    }

    Ok(action)
}

fn require_allowed(action: &str, caps: &Capabilities) -> Result<String, ApiError> {
    if caps.is_allowed(action) {
        Ok(action.to_string())
    } else {
        Err(ApiError::forbidden_with_actions(
            format!("Action '{}' is not allowed for this resource", action),
            caps.allowed_list(),
        ))
    }
}
