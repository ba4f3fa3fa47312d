//! End-to-end walkthrough of the users API against a running server.
//!
//! `BASE_URL` defaults to `http://localhost:8000`.

use anyhow::Context;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use tracing::{info, warn};
use users_service::users::dto::UserResponse;

struct Demo {
    http: Client,
    base: String,
}

impl Demo {
    async fn call(
        &self,
        title: &str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let url = format!("{}{}", self.base, path);
        let mut req = self.http.request(method.clone(), &url);
        if let Some(body) = &body {
            req = req.json(body);
        }
        let resp = req
            .send()
            .await
            .with_context(|| format!("{} {} (is the server running?)", method, url))?;
        let status = resp.status();
        let value = resp.json::<Value>().await.unwrap_or(Value::Null);

        println!("\n{}\n{} {} -> {}", "=".repeat(60), method, path, status);
        println!("{}", serde_json::to_string_pretty(&value)?);
        if status.is_success() {
            info!(%status, "{}", title);
        } else {
            warn!(%status, "{}", title);
        }
        Ok((status, value))
    }

    async fn create(&self, email: &str, password: &str) -> anyhow::Result<Option<UserResponse>> {
        let (status, body) = self
            .call(
                &format!("create {}", email),
                Method::POST,
                "/users/",
                Some(json!({ "email": email, "password": password })),
            )
            .await?;
        if status != StatusCode::CREATED {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(body)?))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let demo = Demo {
        http: Client::new(),
        base: std::env::var("BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".into())
            .trim_end_matches('/')
            .to_string(),
    };

    demo.call("health check", Method::GET, "/health", None).await?;

    let alice = demo.create("alice@example.com", "password123").await?;
    let bob = demo.create("bob@example.com", "securepass456").await?;
    demo.create("charlie@example.com", "mypassword789").await?;
    demo.create("alice@example.com", "password123").await?;

    demo.call("list users", Method::GET, "/users/?skip=0&limit=100", None)
        .await?;
    demo.call("first page of two", Method::GET, "/users/?skip=0&limit=2", None)
        .await?;

    if let Some(alice) = &alice {
        demo.call("get alice", Method::GET, &format!("/users/{}", alice.user_id), None)
            .await?;
    }
    demo.call("get missing user", Method::GET, "/users/9999", None)
        .await?;

    if let Some(bob) = &bob {
        let path = format!("/users/{}", bob.user_id);
        demo.call(
            "verify bob",
            Method::PATCH,
            &path,
            Some(json!({ "is_verified": true })),
        )
        .await?;
        demo.call(
            "change bob's password",
            Method::PATCH,
            &path,
            Some(json!({ "password": "newsecurepass999" })),
        )
        .await?;
    }

    if let Some(alice) = &alice {
        let path = format!("/users/{}", alice.user_id);
        demo.call("soft delete alice", Method::DELETE, &path, None)
            .await?;
        demo.call("alice after delete", Method::GET, &path, None)
            .await?;
    }

    demo.call("final listing", Method::GET, "/users/", None).await?;
    Ok(())
}
