//! Casbin model for `(subject, object, action)` decisions
//!
//! Permission lines are `p = sub, obj, act` and grouping lines are `g = _, _`.
//! A request matches when its subject reaches the line's subject through
//! groupings (or is that subject) and object and action compare equal.
//! With wildcard matching enabled the rule side is read with `keyMatch`, so a
//! rule value of `*` matches anything and `reports/*` matches by prefix.
//! Request values are never treated as patterns.

use casbin::DefaultModel;

use crate::error::{RbacError, RbacResult};

/// Maximum depth of a role chain followed during role resolution
pub const MAX_ROLE_DEPTH: usize = 1_000;

const DEFINITIONS: &str = r#"[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow))
"#;

const EXACT_MATCHER: &str = "m = g(r.sub, p.sub) && r.obj == p.obj && r.act == p.act";

const WILDCARD_MATCHER: &str =
    "m = g(r.sub, p.sub) && keyMatch(r.obj, p.obj) && keyMatch(r.act, p.act)";

/// Model text for the given matching mode
pub fn model_text(wildcard_matching: bool) -> String {
    let matcher = if wildcard_matching {
        WILDCARD_MATCHER
    } else {
        EXACT_MATCHER
    };
    format!("{}\n[matchers]\n{}\n", DEFINITIONS, matcher)
}

/// Parse the policy model
pub async fn policy_model(wildcard_matching: bool) -> RbacResult<DefaultModel> {
    DefaultModel::from_str(&model_text(wildcard_matching))
        .await
        .map_err(|e| RbacError::internal(format!("invalid policy model: {}", e)))
}
