/// Liveness probe inside the API subtree. Always public.
pub async fn ping() -> &'static str {
    "ok"
}

pub async fn health_check() -> &'static str {
    "OK"
}
