//! Input validation utilities
//!
//! Checks run before any request is sent. The server remains authoritative;
//! these only keep obviously invalid input off the network.

use common::{ApiResult, ClientError};

use crate::models::{LoginRequest, NewTask, SignupRequest, TaskUpdate};

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

fn invalid<T>(message: &str) -> ApiResult<T> {
    Err(ClientError::Validation(message.to_string()))
}

/// Validate login credentials
pub fn validate_login(email: &str, password: &str) -> ApiResult<LoginRequest> {
    let email = email.trim();
    if email.is_empty() {
        return invalid("Email is required");
    }

    if password.is_empty() {
        return invalid("Password is required");
    }

    Ok(LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    })
}

/// Validate signup input; a blank name is sent as absent
pub fn validate_signup(
    email: &str,
    password: &str,
    name: Option<&str>,
) -> ApiResult<SignupRequest> {
    let LoginRequest { email, password } = validate_login(email, password)?;
    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    Ok(SignupRequest {
        email,
        password,
        name,
    })
}

/// Validate a task title, returning it trimmed
pub fn validate_title(title: &str) -> ApiResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return invalid("Title is required");
    }

    if title.chars().count() > MAX_TITLE_CHARS {
        return invalid("Title must be between 1 and 200 characters");
    }

    Ok(title.to_string())
}

/// Validate a task description; blank descriptions become `None`
pub fn validate_description(description: Option<&str>) -> ApiResult<Option<String>> {
    let description = description.map(str::trim).filter(|d| !d.is_empty());

    match description {
        Some(d) if d.chars().count() > MAX_DESCRIPTION_CHARS => {
            invalid("Description must not exceed 1000 characters")
        }
        Some(d) => Ok(Some(d.to_string())),
        None => Ok(None),
    }
}

/// Validate the create form
pub fn validate_new_task(title: &str, description: Option<&str>) -> ApiResult<NewTask> {
    Ok(NewTask {
        title: validate_title(title)?,
        description: validate_description(description)?,
    })
}

/// Validate the edit form
///
/// The title is always sent. The description is sent as an empty string when
/// cleared, so the server overwrites the previous value.
pub fn validate_task_update(title: &str, description: Option<&str>) -> ApiResult<TaskUpdate> {
    Ok(TaskUpdate {
        title: Some(validate_title(title)?),
        description: Some(validate_description(description)?.unwrap_or_default()),
    })
}
