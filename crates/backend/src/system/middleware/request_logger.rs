use axum::body::to_bytes;
use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::shared::format::format_number;

/// Middleware для логирования HTTP запросов
///
/// Пишет в лог: метод и путь, статус, длительность (ms),
/// размер ответа (с разделителями тысяч)
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let response = next.run(req).await;
    let (parts, body) = response.into_parts();

    // Читаем тело ответа, чтобы узнать реальный размер
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(
                "{} {} -> {} in {}ms, body read error: {}",
                method,
                uri.path(),
                parts.status.as_u16(),
                start.elapsed().as_millis(),
                e
            );
            return Response::from_parts(parts, Body::default());
        }
    };

    let status = parts.status.as_u16();
    let elapsed_ms = start.elapsed().as_millis();
    if parts.status.is_server_error() {
        tracing::warn!(
            "{} {} -> {} in {}ms, {} bytes",
            method,
            uri.path(),
            status,
            elapsed_ms,
            format_number(bytes.len())
        );
    } else {
        tracing::info!(
            "{} {} -> {} in {}ms, {} bytes",
            method,
            uri.path(),
            status,
            elapsed_ms,
            format_number(bytes.len())
        );
    }

    // Создаем новый ответ с прочитанным телом
    Response::from_parts(parts, Body::from(bytes))
}
