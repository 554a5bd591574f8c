//! Role admission.
//!
//! A holder's roles satisfy a requirement when every required role is present.
//! Order and duplicates on either side do not matter.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("you do not have enough permissions")]
pub struct Forbidden;

pub fn admit(holder_roles: &[i32], required_roles: &[i32]) -> Result<(), Forbidden> {
    if required_roles.is_empty() {
        return Ok(());
    }

    let held: HashSet<i32> = holder_roles.iter().copied().collect();
    if required_roles.iter().all(|r| held.contains(r)) {
        Ok(())
    } else {
        Err(Forbidden)
    }
}

/// Parse a comma-separated role list such as `2,1,3,4`.
pub fn parse_role_list(raw: &str) -> Option<Vec<i32>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i32>().ok().filter(|r| *r > 0))
        .collect()
}
