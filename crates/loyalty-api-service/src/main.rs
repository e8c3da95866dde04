//! 积分平台 API 服务入口
//!
//! 提供订单、竞猜、投票、行为奖励与积分账户的 REST API。

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Request,
    http::HeaderValue,
    middleware,
    middleware::Next,
    response::Response,
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use loyalty_api_service::{
    auth::JwtConfig,
    middleware::auth_middleware,
    routes,
    state::AppState,
};
use loyalty_shared::{
    cache::Cache,
    config::AppConfig,
    database::Database,
    observability::{self, middleware as obs_middleware},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 统一加载配置：config/default.toml -> config/{env}.toml
    // -> config/loyalty-api-service.toml -> LOYALTY_* 环境变量
    let config = AppConfig::load("loyalty-api-service").unwrap_or_default();
    observability::init(&config.observability)?;

    info!("Starting loyalty-api-service on {}", config.server_addr());

    // 初始化基础设施
    let db = Database::connect(&config.database).await?;
    let cache = Arc::new(Cache::new(&config.redis)?);

    // JWT 密钥配置：生产环境必须通过环境变量注入，开发环境使用默认值
    let jwt_secret = std::env::var("LOYALTY_JWT_SECRET").unwrap_or_else(|_| {
        if config.is_production() {
            panic!("LOYALTY_JWT_SECRET must be set in production environment");
        }
        warn!("Using default JWT secret - set LOYALTY_JWT_SECRET for production");
        JwtConfig::default().secret
    });

    let jwt_expires = std::env::var("LOYALTY_JWT_EXPIRES_SECS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(86400);

    let jwt_config = JwtConfig {
        secret: jwt_secret,
        expires_in_secs: jwt_expires,
        issuer: "loyalty-api-service".to_string(),
    };

    let state = AppState::new(db.pool().clone(), cache.clone(), jwt_config);

    // CORS 配置：通过 LOYALTY_CORS_ORIGINS 环境变量控制允许的来源
    let allowed_origins = std::env::var("LOYALTY_CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());

    let cors = if allowed_origins == "*" {
        if config.is_production() {
            warn!("LOYALTY_CORS_ORIGINS=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        info!("CORS allowed_origins: * (all origins)");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        info!("CORS allowed_origins: {}", allowed_origins);
        let origins: Vec<_> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = Router::new()
        .nest("/api", routes::api_routes())
        .route("/health", get(health_check))
        .route(
            "/ready",
            get({
                let db_for_ready = db;
                let cache_for_ready = cache;
                move || readiness_check(db_for_ready.clone(), cache_for_ready.clone())
            }),
        )
        // HTTP 安全头：即使反向代理未配置也确保基本安全策略生效
        .layer(middleware::from_fn(security_headers))
        .layer(cors)
        // 认证中间件：验证 JWT Token
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        // 可观测性中间件：请求追踪和请求 ID
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：收到 SIGTERM（K8s 停止 Pod）或 Ctrl+C 时，
    // 停止接收新连接并等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// 为所有响应注入 HTTP 安全头
async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    // 禁止浏览器猜测 Content-Type
    headers.insert("x-content-type-options", "nosniff".parse().unwrap());
    // 禁止页面被嵌入 iframe
    headers.insert("x-frame-options", "DENY".parse().unwrap());
    // 强制浏览器后续访问只使用 HTTPS
    headers.insert(
        "strict-transport-security",
        "max-age=31536000; includeSubDomains".parse().unwrap(),
    );
    headers.insert("x-xss-protection", "0".parse().unwrap());
    response
}

/// 监听关闭信号
///
/// K8s 通过 SIGTERM 通知 Pod 停止；本地开发通过 Ctrl+C。
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("注册 Ctrl+C 处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("注册 SIGTERM 处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// 存活探针：服务进程正常即返回 ok
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "loyalty-api-service"
    }))
}

/// 就绪探针：检查数据库和 Redis 连接是否可用
async fn readiness_check(db: Database, cache: Arc<Cache>) -> Json<serde_json::Value> {
    let db_ok = db.health_check().await.is_ok();
    let cache_ok = cache.health_check().await.is_ok();
    let all_ok = db_ok && cache_ok;

    Json(serde_json::json!({
        "status": if all_ok { "ok" } else { "degraded" },
        "service": "loyalty-api-service",
        "checks": {
            "database": if db_ok { "ok" } else { "fail" },
            "redis": if cache_ok { "ok" } else { "fail" }
        }
    }))
}
