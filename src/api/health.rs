pub(crate) async fn health() -> &'static str {
    "OK"
}
