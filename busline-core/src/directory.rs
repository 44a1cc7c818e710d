use busline_shared::User;

/// Case-insensitive substring match on name, email, or role. A blank term
/// keeps everyone.
pub fn filter_users<'a>(users: &'a [User], term: &str) -> Vec<&'a User> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return users.iter().collect();
    }

    users
        .iter()
        .filter(|u| {
            u.name.to_lowercase().contains(&term)
                || u.email
                    .as_deref()
                    .map(|e| e.to_lowercase().contains(&term))
                    .unwrap_or(false)
                || u.role.as_str().contains(&term)
        })
        .collect()
}
