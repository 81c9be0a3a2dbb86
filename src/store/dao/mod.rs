// モジュールの公開と型の再エクスポート
pub(crate) mod dao_impl;
pub(crate) mod dao_trait;
mod job;
mod media;
mod recipe;

#[cfg(test)]
pub(crate) mod mock;

pub(crate) use dao_impl::PgImportStore;
pub(crate) use dao_trait::ImportStore;
