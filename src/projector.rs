//! Read-only views over a snapshot of the committed user list.

use crate::user::{Role, User};
use chrono::{DateTime, Months, Utc};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Headline numbers shown above the user list
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub active: usize,
    pub support: usize,
}

fn matches_term(user: &User, term: &str) -> bool {
    let needle = term.to_lowercase();
    user.name.to_lowercase().contains(&needle)
        || user.nif.as_deref().is_some_and(|nif| nif.contains(term))
        || user.email.to_lowercase().contains(&needle)
}

/// Manageable users whose name or email (case-insensitive) or nif contains
/// `term`, in committed order. An empty term matches everyone.
pub fn visible_users<'a>(all: &'a [User], term: &str) -> Vec<&'a User> {
    all.iter()
        .filter(|u| u.is_manageable())
        .filter(|u| term.is_empty() || matches_term(u, term))
        .collect()
}

/// Whole days (rounded up) until the one-year subscription that starts at
/// the first access runs out. Negative once expired, `None` if the user has
/// never logged in.
pub fn subscription_days_remaining(user: &User, now: DateTime<Utc>) -> Option<i64> {
    let first_access = user.first_access_date?;
    let expires = first_access
        .checked_add_months(Months::new(12))
        .unwrap_or(first_access);
    let millis = (expires - now).num_milliseconds();
    Some(div_ceil(millis, MILLIS_PER_DAY))
}

fn div_ceil(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b > 0 {
        q + 1
    } else {
        q
    }
}

pub fn counts(all: &[User]) -> Counts {
    all.iter()
        .filter(|u| u.is_manageable())
        .fold(Counts::default(), |mut c, u| {
            c.total += 1;
            if u.is_active {
                c.active += 1;
            }
            if u.role == Role::Support {
                c.support += 1;
            }
            c
        })
}

/// Split a projection into employees and support staff, keeping order
pub fn partition_by_role<'a>(users: &[&'a User]) -> (Vec<&'a User>, Vec<&'a User>) {
    users
        .iter()
        .copied()
        .filter(|u| u.is_manageable())
        .partition(|u| u.role == Role::Employee)
}
