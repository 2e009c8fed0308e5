//! Operator-facing notice texts.

pub const SELF_DELETION: &str = "You cannot delete yourself";
pub const DELETE_CONFIRMATION: &str = "Are you sure you want to permanently delete this user?";
pub const DELETE_BLOCKED_BY_DEPENDENTS: &str = "This user has associated records";
pub const DELETE_FAILED: &str = "Error deleting user";
pub const DELETE_SUCCEEDED: &str = "User deleted successfully";

pub const LIST_FAILED: &str = "Error connecting to the server";

pub const RECORD_NOT_FOUND: &str = "Error 404: User not found";
pub const UPDATE_SUCCEEDED: &str = "Data updated successfully";
pub const UPDATE_FAILED: &str = "Error connecting to the server";

pub const REGISTER_SUCCEEDED: &str = "Registration successful! Redirecting...";
pub const REGISTER_FAILED: &str = "Error registering user";
pub const CONNECTION_FAILED: &str = "Error connecting to the server";

pub const LOGIN_SUCCEEDED: &str = "Access granted";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub const LOGGED_OUT: &str = "Signed out";

pub const SESSION_SAVE_FAILED: &str = "Could not save the session on this device";
pub const SESSION_CLEAR_FAILED: &str = "Could not clear the session on this device";
