use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use flowscope_loki::{HttpClient, LokiConfig, loki_error_message};
use flowscope_types::{FilterGroup, QueryResponse, ResultValue};

use crate::builder::FlowQueryBuilder;
use crate::decode::decode_filters;
use crate::error::FlowError;
use crate::group::group_all;
use crate::params::FlowParams;

const FETCH_ERROR_PREFIX: &str = "Error while fetching flows from Loki: ";

/// Runs flow requests against Loki, one query per filter group
pub struct FlowFetcher<C: ?Sized> {
    config: Arc<LokiConfig>,
    client: Arc<C>,
}

impl<C: ?Sized> Clone for FlowFetcher<C> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            client: Arc::clone(&self.client),
        }
    }
}

impl<C: HttpClient + ?Sized + 'static> FlowFetcher<C> {
    /// Create a fetcher sharing `client` across requests
    pub fn new(config: LokiConfig, client: Arc<C>) -> Self {
        Self {
            config: Arc::new(config),
            client,
        }
    }

    /// Loki settings used by this fetcher
    pub fn config(&self) -> &LokiConfig {
        &self.config
    }

    /// Fetch the flows matching `params` as a Loki streams JSON body
    ///
    /// Zero or one group returns Loki's body untouched; several groups are
    /// fetched concurrently and merged.
    pub async fn fetch(&self, params: &FlowParams) -> Result<Vec<u8>, FlowError> {
        debug!(?params, "Flow request");
        let result = self.fetch_groups(params).await;
        if let Err(e) = &result {
            warn!(status = e.status_code(), error = %e, "Flow request failed");
        }
        result
    }

    async fn fetch_groups(&self, params: &FlowParams) -> Result<Vec<u8>, FlowError> {
        let decoded = decode_filters(&params.filters);
        let groups = group_all(&self.config, &decoded, params.match_mode)?;

        if groups.len() > 1 {
            return self
                .fetch_parallel(groups, params)
                .await
                .map_err(|e| e.with_prefix(FETCH_ERROR_PREFIX));
        }

        let group = groups.into_iter().next().unwrap_or_default();
        let url = build_url(&self.config, &group, params)?;
        fetch_single(self.client.as_ref(), &url)
            .await
            .map_err(|e| e.with_prefix(FETCH_ERROR_PREFIX))
    }

    async fn fetch_parallel(
        &self,
        groups: Vec<FilterGroup>,
        params: &FlowParams,
    ) -> Result<Vec<u8>, FlowError> {
        let (res_tx, mut res_rx) = mpsc::channel::<QueryResponse>(groups.len());
        let (err_tx, mut err_rx) = mpsc::channel::<FlowError>(groups.len());

        let tasks: Vec<_> = groups
            .into_iter()
            .map(|group| self.spawn_group_fetch(group, params.clone(), res_tx.clone(), err_tx.clone()))
            .collect();
        drop(res_tx);
        drop(err_tx);

        // Every task runs to completion, even after a sibling failed
        let mut join_failure = None;
        for joined in join_all(tasks).await {
            if let Err(e) = joined {
                join_failure.get_or_insert_with(|| FlowError::Internal(e.to_string()));
            }
        }

        if let Some(err) = err_rx.recv().await {
            return Err(err);
        }
        if let Some(err) = join_failure {
            return Err(err);
        }

        let mut responses = Vec::new();
        while let Some(resp) = res_rx.recv().await {
            responses.push(resp);
        }
        let aggregated = aggregate(responses)?;
        debug!(entries = aggregated.entry_count(), "Aggregated flow results");
        Ok(serde_json::to_vec(&aggregated)?)
    }

    fn spawn_group_fetch(
        &self,
        group: FilterGroup,
        params: FlowParams,
        res_tx: mpsc::Sender<QueryResponse>,
        err_tx: mpsc::Sender<FlowError>,
    ) -> tokio::task::JoinHandle<()> {
        let config = Arc::clone(&self.config);
        let client = Arc::clone(&self.client);

        tokio::spawn(async move {
            debug!(%group, "Fetching filter group");
            let result = async {
                let url = build_url(&config, &group, &params)?;
                let body = fetch_single(client.as_ref(), &url).await?;
                Ok::<_, FlowError>(serde_json::from_slice::<QueryResponse>(&body)?)
            }
            .await;

            // Receivers outlive every task, sends cannot fail
            match result {
                Ok(resp) => {
                    let _ = res_tx.send(resp).await;
                }
                Err(e) => {
                    let _ = err_tx.send(e).await;
                }
            }
        })
    }
}

fn build_url(config: &LokiConfig, group: &FilterGroup, params: &FlowParams) -> Result<String, FlowError> {
    let mut qb = FlowQueryBuilder::new(
        config,
        params.start.as_deref(),
        params.end.as_deref(),
        params.limit.as_deref(),
        params.reporter,
    )
    .direction(params.direction.as_deref());
    qb.filters(group)?;
    qb.build().url_query()
}

/// Issue one GET and return the body of a 200 answer
pub async fn fetch_single<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>, FlowError> {
    debug!(url, "Loki query");
    let resp = client
        .get(url)
        .await
        .map_err(|e| FlowError::BackendUnavailable(e.to_string()))?;

    if resp.status != 200 {
        let message = loki_error_message(&resp.body, resp.status);
        return Err(FlowError::BackendError(format!(
            "Loki backend responded: {}",
            message
        )));
    }
    trace!(body = %String::from_utf8_lossy(&resp.body), "Loki response body");
    Ok(resp.body)
}

/// Merge the streams of several responses into the envelope of the first
pub fn aggregate(responses: Vec<QueryResponse>) -> Result<QueryResponse, FlowError> {
    let mut aggregated: Option<QueryResponse> = None;
    for resp in responses {
        if let ResultValue::Other { result_type, .. } = &resp.data.result {
            return Err(FlowError::Internal(format!(
                "loki returned an unexpected type: {}",
                result_type
            )));
        }
        match aggregated.as_mut() {
            None => aggregated = Some(resp),
            Some(acc) => {
                if let (ResultValue::Streams(streams), ResultValue::Streams(more)) =
                    (&mut acc.data.result, resp.data.result)
                {
                    streams.extend(more);
                }
            }
        }
    }
    Ok(aggregated.unwrap_or_else(|| QueryResponse::from_streams(Vec::new())))
}
