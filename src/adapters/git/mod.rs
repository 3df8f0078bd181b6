//! Git repository fetcher.

pub mod fetcher;

pub use fetcher::GitRepositoryFetcher;
