pub(crate) mod audit;
pub(crate) mod meta;
pub(crate) mod migrate;
pub(crate) mod output;
pub(crate) mod probe;
pub(crate) mod repo;
pub(crate) mod shared;
pub(crate) mod user;
