use chrono::Utc;
use uuid::Uuid;

use gatehouse_auth::domain::types::{ClientMeta, IdentityAssertion, OAuthLink};
use gatehouse_auth::error::AuthServiceError;
use gatehouse_auth::usecase::oauth::{OAuthLoginUseCase, UNUSABLE_PASSWORD_HASH};
use gatehouse_auth::usecase::rbac::RbacResolver;

use super::helpers::{
    MockOAuthLinkStore, MockRefreshTokenStore, MockRoleStore, MockUserStore, TestHasher,
    default_roles, test_codec, test_user,
};

use gatehouse_auth::domain::repository::PasswordHasher as _;

fn assertion(subject: &str, email: &str) -> IdentityAssertion {
    IdentityAssertion {
        provider: "google".into(),
        subject: subject.to_owned(),
        email: email.to_owned(),
        email_verified: true,
        name: Some("Carol Example".into()),
        picture: None,
    }
}

fn usecase(
    users: &MockUserStore,
    links: &MockOAuthLinkStore,
    roles: &MockRoleStore,
    tokens: &MockRefreshTokenStore,
    allow_signup: bool,
) -> OAuthLoginUseCase<MockUserStore, MockOAuthLinkStore, MockRoleStore, MockRefreshTokenStore> {
    OAuthLoginUseCase {
        users: users.clone(),
        links: links.clone(),
        rbac: RbacResolver {
            roles: roles.clone(),
        },
        refresh_tokens: tokens.clone(),
        codec: test_codec(),
        allow_signup,
    }
}

#[tokio::test]
async fn unverified_provider_email_is_always_forbidden() {
    let user = test_user("carol@example.com", "pw");
    let users = MockUserStore::new(vec![user.clone()]);
    // even an existing link does not rescue an unverified assertion
    let links = MockOAuthLinkStore::new(vec![OAuthLink {
        id: Uuid::new_v4(),
        provider: "google".into(),
        provider_sub: "sub-1".into(),
        user_id: user.id,
        email: None,
        name: None,
        picture: None,
        created_at: Utc::now(),
    }]);
    let tokens = MockRefreshTokenStore::new();

    let mut a = assertion("sub-1", "carol@example.com");
    a.email_verified = false;

    let err = usecase(&users, &links, &default_roles(), &tokens, true)
        .execute(a, &ClientMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthServiceError::Forbidden));
    assert_eq!(tokens.active_count(), 0);
}

#[tokio::test]
async fn first_contact_auto_signup_creates_a_passwordless_verified_user() {
    let users = MockUserStore::empty();
    let links = MockOAuthLinkStore::empty();
    let tokens = MockRefreshTokenStore::new();

    let out = usecase(&users, &links, &default_roles(), &tokens, true)
        .execute(assertion("sub-9", "carol@example.com"), &ClientMeta::default())
        .await
        .unwrap();

    assert!(out.signed_up);
    let user = users.get(out.user.id).unwrap();
    assert_eq!(user.email, "carol@example.com");
    assert_eq!(user.full_name, "Carol Example");
    assert!(user.email_verified_at.is_some());
    assert_eq!(user.roles, vec!["user".to_string()]);
    assert_eq!(user.password_hash, UNUSABLE_PASSWORD_HASH);
    assert!(!TestHasher.verify("anything", &user.password_hash));
    assert_eq!(links.count(), 1);
    assert_eq!(tokens.active_count(), 1);
}

#[tokio::test]
async fn auto_signup_falls_back_to_the_email_local_part() {
    let users = MockUserStore::empty();
    let links = MockOAuthLinkStore::empty();
    let tokens = MockRefreshTokenStore::new();

    let mut a = assertion("sub-9", "dave@example.com");
    a.name = None;
    let out = usecase(&users, &links, &default_roles(), &tokens, true)
        .execute(a, &ClientMeta::default())
        .await
        .unwrap();
    assert_eq!(out.user.full_name, "dave");
}

#[tokio::test]
async fn existing_link_logs_in_without_touching_accounts() {
    let user = test_user("carol@example.com", "pw");
    let users = MockUserStore::new(vec![user.clone()]);
    let links = MockOAuthLinkStore::new(vec![OAuthLink {
        id: Uuid::new_v4(),
        provider: "google".into(),
        provider_sub: "sub-1".into(),
        user_id: user.id,
        email: Some(user.email.clone()),
        name: None,
        picture: None,
        created_at: Utc::now(),
    }]);
    let tokens = MockRefreshTokenStore::new();

    let out = usecase(&users, &links, &default_roles(), &tokens, false)
        .execute(assertion("sub-1", "carol@example.com"), &ClientMeta::default())
        .await
        .unwrap();

    assert!(!out.signed_up);
    assert_eq!(out.user.id, user.id);
    assert_eq!(users.count(), 1);
    assert_eq!(links.count(), 1);
    assert_eq!(tokens.active_count(), 1);
}

#[tokio::test]
async fn matching_email_adopts_the_local_account_and_links_it() {
    let user = test_user("carol@example.com", "pw");
    let users = MockUserStore::new(vec![user.clone()]);
    let links = MockOAuthLinkStore::empty();
    let tokens = MockRefreshTokenStore::new();

    let out = usecase(&users, &links, &default_roles(), &tokens, true)
        .execute(assertion("sub-1", "carol@example.com"), &ClientMeta::default())
        .await
        .unwrap();

    assert!(!out.signed_up);
    assert_eq!(out.user.id, user.id);
    // the local credential survives adoption
    assert_eq!(users.get(user.id).unwrap().password_hash, "hashed:pw");
    assert_eq!(links.count(), 1);
    assert_eq!(
        links.links.lock().unwrap()[0].user_id,
        user.id
    );
}

#[tokio::test]
async fn first_contact_without_signup_permission_is_forbidden() {
    let users = MockUserStore::empty();
    let links = MockOAuthLinkStore::empty();
    let tokens = MockRefreshTokenStore::new();

    let err = usecase(&users, &links, &default_roles(), &tokens, false)
        .execute(assertion("sub-1", "carol@example.com"), &ClientMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthServiceError::Forbidden));
    assert_eq!(users.count(), 0);
    assert_eq!(links.count(), 0);
}

#[tokio::test]
async fn dangling_link_surfaces_as_not_found() {
    let users = MockUserStore::empty();
    let links = MockOAuthLinkStore::new(vec![OAuthLink {
        id: Uuid::new_v4(),
        provider: "google".into(),
        provider_sub: "sub-1".into(),
        user_id: Uuid::new_v4(),
        email: None,
        name: None,
        picture: None,
        created_at: Utc::now(),
    }]);
    let tokens = MockRefreshTokenStore::new();

    let err = usecase(&users, &links, &default_roles(), &tokens, true)
        .execute(assertion("sub-1", "carol@example.com"), &ClientMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthServiceError::NotFound));
}

#[tokio::test]
async fn linked_but_deactivated_user_cannot_log_in() {
    let mut user = test_user("carol@example.com", "pw");
    user.is_active = false;
    let users = MockUserStore::new(vec![user.clone()]);
    let links = MockOAuthLinkStore::new(vec![OAuthLink {
        id: Uuid::new_v4(),
        provider: "google".into(),
        provider_sub: "sub-1".into(),
        user_id: user.id,
        email: None,
        name: None,
        picture: None,
        created_at: Utc::now(),
    }]);
    let tokens = MockRefreshTokenStore::new();

    let err = usecase(&users, &links, &default_roles(), &tokens, true)
        .execute(assertion("sub-1", "carol@example.com"), &ClientMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthServiceError::Unauthorized));
    assert_eq!(tokens.active_count(), 0);
}
