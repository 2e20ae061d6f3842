//! User-mutation body rewriting.
//!
//! For create-user and update-user requests the JSON body is decoded,
//! validated, its plaintext password replaced with a bcrypt hash and the
//! result re-encoded before dispatch. Every other request passes through
//! with its body untouched.
//!
//! Create-user bodies also get a fresh UUID v4 `userId`, overwriting
//! whatever the client sent, and have `email` and `username` trimmed.
//! Passwords are validated and hashed exactly as sent.
//! Update-user bodies take their `email` from the path.

use crate::{
    context::GatewayContext,
    hasher::PasswordHasher,
    middleware::{BoxFuture, Middleware, Next},
    pipeline::Stage,
    stages::reject,
    types::{Request, Response},
    validate::{validate_name, validate_password, validate_username},
};
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http_body_util::{BodyExt, Full};
use idgate_core::{CreateUserPayload, GatewayError, GatewayResult, RequestKind, UpdateUserPayload};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// Path parameter naming the user an update applies to.
const EMAIL_PARAM: &str = "email";

/// Fourth pipeline stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserBodyMiddleware {
    hasher: PasswordHasher,
}

impl UserBodyMiddleware {
    /// Creates the stage with `hasher`.
    pub fn new(hasher: PasswordHasher) -> Self {
        Self { hasher }
    }

    /// Rewrites a create-user body.
    pub async fn rewrite_create(&self, body: &[u8]) -> GatewayResult<Bytes> {
        let mut payload: CreateUserPayload = decode(body)?;

        let email = payload.email.trim().to_string();
        let name = payload.username.trim().to_string();
        let password = plaintext(std::mem::take(&mut payload.hash))?;

        validate_username(&email)?;
        validate_password(&password)?;
        if !name.is_empty() {
            validate_name(&name)?;
        }

        payload.hash = self.hasher.hash(password).await?.into_bytes();
        payload.user_id = Uuid::new_v4().to_string();
        payload.email = email;
        payload.username = name;

        debug!(user_id = %payload.user_id, "Rewrote create-user body");
        encode(&payload)
    }

    /// Rewrites an update-user body for the user named by `email`.
    ///
    /// Empty optional fields are forwarded as absent.
    pub async fn rewrite_update(&self, email: Option<&str>, body: &[u8]) -> GatewayResult<Bytes> {
        let mut payload: UpdateUserPayload = decode(body)?;

        let email = email.map(str::trim).unwrap_or_default();
        if email.is_empty() {
            return Err(GatewayError::validation("username is required"));
        }
        payload.email = email.to_string();

        payload.new_username = match payload.new_username.take() {
            Some(name) if !name.trim().is_empty() => {
                let name = name.trim().to_string();
                validate_name(&name)?;
                Some(name)
            }
            _ => None,
        };

        payload.new_hash = match payload.new_hash.take() {
            Some(raw) if !raw.is_empty() => {
                let password = plaintext(raw)?;
                validate_password(&password)?;
                Some(self.hasher.hash(password).await?.into_bytes())
            }
            _ => None,
        };

        encode(&payload)
    }
}

impl Middleware for UserBodyMiddleware {
    fn name(&self) -> &'static str {
        Stage::BodyTransform.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut GatewayContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let kind = ctx.request_kind(request.method());
            if !kind.rewrites_body() {
                return next.run(ctx, request).await;
            }

            let (mut parts, body) = request.into_parts();
            let body = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };

            let rewritten = if kind == RequestKind::CreateUser {
                self.rewrite_create(&body).await
            } else {
                let email = ctx.path_param(EMAIL_PARAM).map(str::to_string);
                self.rewrite_update(email.as_deref(), &body).await
            };

            match rewritten {
                Ok(body) => {
                    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
                    parts
                        .headers
                        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                    next.run(ctx, Request::from_parts(parts, Full::new(body)))
                        .await
                }
                Err(e) => reject(ctx, Stage::BodyTransform, &e),
            }
        })
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> GatewayResult<T> {
    serde_json::from_slice(body).map_err(|e| GatewayError::malformed_body(e.to_string()))
}

fn encode<T: Serialize>(payload: &T) -> GatewayResult<Bytes> {
    serde_json::to_vec(payload)
        .map(Bytes::from)
        .map_err(|e| GatewayError::internal(format!("failed to encode body: {e}")))
}

fn plaintext(raw: Vec<u8>) -> GatewayResult<String> {
    String::from_utf8(raw).map_err(|_| GatewayError::validation("password must be valid UTF-8 text"))
}
