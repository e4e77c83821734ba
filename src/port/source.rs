//! Backend fetch port.

use async_trait::async_trait;

use crate::domain::{Cursor, DependentQueryKey, FetchedPage};
use crate::error::FetchError;

/// Serves pages of one paginated resource.
///
/// Implementations must be idempotent per cursor: the coordinator retries the
/// same cursor after a failure and never advances past a page it did not
/// append.
///
/// # Example
///
/// ```ignore
/// struct CitiesApi {
///     http: reqwest::Client,
/// }
///
/// #[async_trait]
/// impl PageSource<City> for CitiesApi {
///     async fn fetch_page(
///         &self,
///         key: &DependentQueryKey,
///         cursor: Option<Cursor>,
///     ) -> Result<FetchedPage<City>, FetchError> {
///         let province = key.parent_id().map(|p| p.as_str()).unwrap_or_default();
///         let body: CitiesPage = self
///             .http
///             .get(format!("/regions/{province}/cities"))
///             .query(&[("cursor", cursor.as_ref().map(Cursor::as_str))])
///             .send()
///             .await
///             .map_err(|e| FetchError::Transport(e.to_string()))?
///             .json()
///             .await
///             .map_err(|e| FetchError::Decode(e.to_string()))?;
///         Ok(body.into())
///     }
/// }
/// ```
#[async_trait]
pub trait PageSource<T: Send>: Send + Sync {
    /// Fetch the page that starts at `cursor`, or the first page for `None`.
    async fn fetch_page(
        &self,
        key: &DependentQueryKey,
        cursor: Option<Cursor>,
    ) -> Result<FetchedPage<T>, FetchError>;
}
