use crate::models::UserStory;

/// Stories offered to clients as starting points.
pub fn example_stories() -> Vec<UserStory> {
    vec![
        UserStory {
            id: "US001".to_string(),
            title: "Password Reset Functionality".to_string(),
            story: r#"User Story: As a customer, I want to be able to reset my password so that I can regain access to my account if I forget my credentials.

Acceptance Criteria:
1. User can click "Forgot Password" link on login page
2. User enters their email address in the password reset form
3. System validates email format and existence in database
4. System sends password reset email with secure token
5. User clicks link in email to access password reset page
6. User enters new password and confirms it
7. System validates password strength requirements
8. System updates password in database and invalidates old token
9. User receives confirmation email
10. User can login with new password"#
                .to_string(),
        },
        UserStory {
            id: "US002".to_string(),
            title: "User Registration".to_string(),
            story: r#"User Story: As a new user, I want to register for an account so that I can access the application.

Acceptance Criteria:
1. User can access registration page
2. User can enter required information (name, email, password)
3. System validates email format and uniqueness
4. System validates password strength requirements
5. User receives email verification link
6. User can verify email by clicking link
7. Account is activated after email verification
8. User can login with verified account"#
                .to_string(),
        },
    ]
}

/// Joins a story and its acceptance criteria into the text sent to the generator.
pub fn compose_story(user_story: &str, acceptance_criteria: &str) -> String {
    format!("{}\n\nAcceptance Criteria:\n{}", user_story, acceptance_criteria)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn examples_have_unique_ids() {
        let stories = example_stories();
        assert_eq!(stories.len(), 2);
        assert_ne!(stories[0].id, stories[1].id);
        assert!(stories.iter().all(|s| s.story.contains("Acceptance Criteria")));
    }

    #[test]
    fn composes_story_with_criteria() {
        assert_eq!(
            compose_story("As a user", "1. Works"),
            "As a user\n\nAcceptance Criteria:\n1. Works"
        );
    }
}
