use crate::auth::jwt::{Claims, TokenType, verify_token};
use crate::config::Config;
use crate::model::role::Role;
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};

/// Identity of the worker making the current request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub worker_id: u64,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    /// Builds the identity from a verified access token.
    pub fn from_claims(claims: Claims) -> Result<Self, &'static str> {
        if claims.token_type != TokenType::Access {
            return Err("Access token required");
        }
        let role = Role::from_id(claims.role).ok_or("Invalid role")?;

        Ok(AuthUser {
            worker_id: claims.worker_id,
            email: claims.sub,
            role,
        })
    }

    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }

    /// Admins may act on any worker; everyone else only on themselves.
    pub fn require_self_or_admin(&self, worker_id: u64) -> actix_web::Result<()> {
        if self.is_admin() || self.worker_id == worker_id {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Not allowed"))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) => c,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        ready(AuthUser::from_claims(claims).map_err(ErrorUnauthorized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{generate_access_token, generate_refresh_token};
    use actix_web::test::TestRequest;

    fn config() -> Data<Config> {
        Data::new(Config::for_tests())
    }

    #[actix_web::test]
    async fn extracts_identity_from_bearer_token() {
        let config = config();
        let token = generate_access_token(
            3,
            "admin@company.com".into(),
            Role::Administrator,
            &config.jwt_secret,
            60,
        )
        .unwrap();

        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {token}")))
            .app_data(config)
            .to_http_request();
        let user = AuthUser::extract(&req).await.unwrap();

        assert_eq!(user.worker_id, 3);
        assert!(user.require_admin().is_ok());
        assert!(user.require_self_or_admin(99).is_ok());
    }

    #[actix_web::test]
    async fn refresh_token_is_not_an_identity() {
        let config = config();
        let (token, _) = generate_refresh_token(
            3,
            "ana@company.com".into(),
            Role::Employee,
            &config.jwt_secret,
            60,
        )
        .unwrap();

        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {token}")))
            .app_data(config)
            .to_http_request();
        assert!(AuthUser::extract(&req).await.is_err());
    }

    #[test]
    fn employees_are_limited_to_themselves() {
        let user = AuthUser {
            worker_id: 5,
            email: "ana@company.com".into(),
            role: Role::Employee,
        };
        assert!(user.require_admin().is_err());
        assert!(user.require_self_or_admin(5).is_ok());
        assert!(user.require_self_or_admin(6).is_err());
    }
}
