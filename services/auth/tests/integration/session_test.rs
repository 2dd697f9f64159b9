use gatehouse_auth::domain::types::ClientMeta;
use gatehouse_auth::error::AuthServiceError;
use gatehouse_auth::usecase::rbac::RbacResolver;
use gatehouse_auth::usecase::session::{
    LoginInput, LoginUseCase, LogoutUseCase, RefreshSessionUseCase, hash_refresh_token,
};
use gatehouse_auth_types::token::TokenKind;

use super::helpers::{
    MockRefreshTokenStore, MockRoleStore, MockUserStore, TestHasher, default_roles, test_codec,
    test_role, test_user,
};

fn login_usecase(
    users: &MockUserStore,
    roles: &MockRoleStore,
    tokens: &MockRefreshTokenStore,
    require_verified: bool,
) -> LoginUseCase<MockUserStore, MockRoleStore, MockRefreshTokenStore, TestHasher> {
    LoginUseCase {
        users: users.clone(),
        rbac: RbacResolver {
            roles: roles.clone(),
        },
        refresh_tokens: tokens.clone(),
        hasher: TestHasher,
        codec: test_codec(),
        require_verified,
    }
}

fn refresh_usecase(
    users: &MockUserStore,
    roles: &MockRoleStore,
    tokens: &MockRefreshTokenStore,
) -> RefreshSessionUseCase<MockUserStore, MockRoleStore, MockRefreshTokenStore> {
    RefreshSessionUseCase {
        users: users.clone(),
        rbac: RbacResolver {
            roles: roles.clone(),
        },
        refresh_tokens: tokens.clone(),
        codec: test_codec(),
    }
}

#[tokio::test]
async fn login_issues_tokens_with_union_of_role_permissions() {
    let mut user = test_user("alice@example.com", "hunter2");
    user.roles = vec!["user".into(), "support".into()];
    let users = MockUserStore::new(vec![user.clone()]);
    let roles = MockRoleStore::new(vec![
        test_role("user", &["profile:read", "profile:write"]),
        test_role("support", &["profile:read", "tickets:write"]),
    ]);
    let tokens = MockRefreshTokenStore::new();

    let out = login_usecase(&users, &roles, &tokens, false)
        .execute(LoginInput {
            email: "alice@example.com".into(),
            password: "hunter2".into(),
            client: ClientMeta::default(),
        })
        .await
        .unwrap();

    let claims = test_codec().validate(&out.tokens.access_token).unwrap();
    assert_eq!(claims.kind, TokenKind::Access);
    assert_eq!(claims.sub, user.id.to_string());
    let perms = claims.perms.unwrap();
    assert_eq!(perms.len(), 3, "duplicates collapse: {perms:?}");
    assert!(perms.contains(&"tickets:write".to_string()));

    // one persisted record, holding a digest and never the raw token
    let records = tokens.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].token_hash,
        hash_refresh_token(&out.tokens.refresh_token)
    );
    assert_ne!(records[0].token_hash, out.tokens.refresh_token);
}

#[tokio::test]
async fn login_failures_all_look_the_same() {
    let mut inactive = test_user("gone@example.com", "pw");
    inactive.is_active = false;
    let users = MockUserStore::new(vec![test_user("alice@example.com", "hunter2"), inactive]);
    let tokens = MockRefreshTokenStore::new();
    let usecase = login_usecase(&users, &default_roles(), &tokens, false);

    for (email, password) in [
        ("nobody@example.com", "hunter2"),
        ("alice@example.com", "wrong"),
        ("gone@example.com", "pw"),
    ] {
        let err = usecase
            .execute(LoginInput {
                email: email.into(),
                password: password.into(),
                client: ClientMeta::default(),
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err, AuthServiceError::Unauthorized),
            "{email}: {err:?}"
        );
    }
    assert_eq!(tokens.active_count(), 0);
}

#[tokio::test]
async fn unverified_login_forbidden_only_when_required() {
    let mut user = test_user("new@example.com", "pw");
    user.email_verified_at = None;
    let users = MockUserStore::new(vec![user]);
    let tokens = MockRefreshTokenStore::new();
    let input = || LoginInput {
        email: "new@example.com".into(),
        password: "pw".into(),
        client: ClientMeta::default(),
    };

    let err = login_usecase(&users, &default_roles(), &tokens, true)
        .execute(input())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthServiceError::Forbidden));

    assert!(
        login_usecase(&users, &default_roles(), &tokens, false)
            .execute(input())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn refresh_rotates_and_spent_token_is_dead() {
    let users = MockUserStore::new(vec![test_user("alice@example.com", "pw")]);
    let roles = default_roles();
    let tokens = MockRefreshTokenStore::new();
    let client = ClientMeta::default();

    let login = login_usecase(&users, &roles, &tokens, false)
        .execute(LoginInput {
            email: "alice@example.com".into(),
            password: "pw".into(),
            client: client.clone(),
        })
        .await
        .unwrap();

    let refresh = refresh_usecase(&users, &roles, &tokens);
    let rotated = refresh
        .execute(&login.tokens.refresh_token, &client)
        .await
        .unwrap();
    assert_ne!(rotated.tokens.refresh_token, login.tokens.refresh_token);
    assert_ne!(rotated.tokens.access_token, login.tokens.access_token);
    assert_eq!(tokens.active_count(), 1);

    // replaying the spent token fails
    let err = refresh
        .execute(&login.tokens.refresh_token, &client)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthServiceError::Unauthorized));
    // and did not cost the holder the live session
    assert_eq!(tokens.active_count(), 1);
}

#[tokio::test]
async fn concurrent_rotation_of_one_token_has_a_single_winner() {
    let users = MockUserStore::new(vec![test_user("alice@example.com", "pw")]);
    let roles = default_roles();
    let tokens = MockRefreshTokenStore::new();

    let login = login_usecase(&users, &roles, &tokens, false)
        .execute(LoginInput {
            email: "alice@example.com".into(),
            password: "pw".into(),
            client: ClientMeta::default(),
        })
        .await
        .unwrap();

    let spawn_rotation = |raw: String| {
        let usecase = refresh_usecase(&users, &roles, &tokens);
        tokio::spawn(async move { usecase.execute(&raw, &ClientMeta::default()).await })
    };
    let a = spawn_rotation(login.tokens.refresh_token.clone());
    let b = spawn_rotation(login.tokens.refresh_token.clone());

    let results = [a.await.unwrap(), b.await.unwrap()];
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one rotation may win");
    assert!(results.iter().any(|r| matches!(
        r,
        Err(AuthServiceError::Unauthorized)
    )));
    // the winner's replacement is the only live session
    assert_eq!(tokens.active_count(), 1);
}

#[tokio::test]
async fn refresh_rejects_access_tokens_and_tampered_records() {
    let user = test_user("alice@example.com", "pw");
    let users = MockUserStore::new(vec![user.clone()]);
    let roles = default_roles();
    let tokens = MockRefreshTokenStore::new();
    let client = ClientMeta::default();
    let refresh = refresh_usecase(&users, &roles, &tokens);

    // kind confusion: a signed access token is not a refresh credential
    let (access, _) = test_codec()
        .issue_access(&user.id.to_string(), vec![], vec![])
        .unwrap();
    assert!(matches!(
        refresh.execute(&access, &client).await,
        Err(AuthServiceError::Unauthorized)
    ));

    // a valid token whose stored digest no longer matches is refused
    let login = login_usecase(&users, &roles, &tokens, false)
        .execute(LoginInput {
            email: "alice@example.com".into(),
            password: "pw".into(),
            client: client.clone(),
        })
        .await
        .unwrap();
    let jti = test_codec()
        .validate(&login.tokens.refresh_token)
        .unwrap()
        .jti
        .parse()
        .unwrap();
    tokens.tamper_hash(jti, "0000");
    assert!(matches!(
        refresh.execute(&login.tokens.refresh_token, &client).await,
        Err(AuthServiceError::Unauthorized)
    ));
}

#[tokio::test]
async fn refresh_embeds_current_roles_not_the_old_claims() {
    let users = MockUserStore::new(vec![test_user("alice@example.com", "pw")]);
    let roles = default_roles();
    let tokens = MockRefreshTokenStore::new();
    let client = ClientMeta::default();

    let login = login_usecase(&users, &roles, &tokens, false)
        .execute(LoginInput {
            email: "alice@example.com".into(),
            password: "pw".into(),
            client: client.clone(),
        })
        .await
        .unwrap();

    // role assignment changes between issuance and rotation
    {
        let mut all = users.users.lock().unwrap();
        all[0].roles = vec![];
    }

    let rotated = refresh_usecase(&users, &roles, &tokens)
        .execute(&login.tokens.refresh_token, &client)
        .await
        .unwrap();
    let claims = test_codec().validate(&rotated.tokens.access_token).unwrap();
    assert_eq!(claims.perms, Some(vec![]));
}

#[tokio::test]
async fn logout_never_fails_and_kills_the_session() {
    let users = MockUserStore::new(vec![test_user("alice@example.com", "pw")]);
    let roles = default_roles();
    let tokens = MockRefreshTokenStore::new();
    let client = ClientMeta::default();

    let login = login_usecase(&users, &roles, &tokens, false)
        .execute(LoginInput {
            email: "alice@example.com".into(),
            password: "pw".into(),
            client: client.clone(),
        })
        .await
        .unwrap();

    let logout = LogoutUseCase {
        refresh_tokens: tokens.clone(),
        codec: test_codec(),
    };
    // total on any input
    logout.execute(None).await;
    logout.execute(Some("garbage")).await;
    logout.execute(Some(&login.tokens.refresh_token)).await;
    // idempotent replay
    logout.execute(Some(&login.tokens.refresh_token)).await;

    assert_eq!(tokens.active_count(), 0);
    assert!(matches!(
        refresh_usecase(&users, &roles, &tokens)
            .execute(&login.tokens.refresh_token, &client)
            .await,
        Err(AuthServiceError::Unauthorized)
    ));
}
