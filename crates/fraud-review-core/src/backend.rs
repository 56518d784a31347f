use async_trait::async_trait;
use fraud_review_client::{
    CaseDetail, MonitoringSnapshot, MonitoringSummary, QueueEntry, QueuePage, ReviewActionReceipt,
    ReviewActionRequest, ReviewApiClient, ReviewApiError, ScoreBucket, TopMerchant,
};

/// Remote operations the controller depends on.
#[async_trait]
pub trait ReviewBackend: Send + Sync + 'static {
    async fn review_queue(&self, page: QueuePage) -> Result<Vec<QueueEntry>, ReviewApiError>;

    async fn review_case(&self, transaction_id: &str) -> Result<CaseDetail, ReviewApiError>;

    async fn record_review_action(
        &self,
        transaction_id: &str,
        request: &ReviewActionRequest,
    ) -> Result<ReviewActionReceipt, ReviewApiError>;

    async fn monitoring_summary(&self) -> Result<MonitoringSummary, ReviewApiError>;

    async fn monitoring_score_buckets(&self) -> Result<Vec<ScoreBucket>, ReviewApiError>;

    async fn monitoring_top_merchants(&self, limit: u32)
    -> Result<Vec<TopMerchant>, ReviewApiError>;
}

#[async_trait]
impl ReviewBackend for ReviewApiClient {
    async fn review_queue(&self, page: QueuePage) -> Result<Vec<QueueEntry>, ReviewApiError> {
        ReviewApiClient::review_queue(self, page).await
    }

    async fn review_case(&self, transaction_id: &str) -> Result<CaseDetail, ReviewApiError> {
        ReviewApiClient::review_case(self, transaction_id).await
    }

    async fn record_review_action(
        &self,
        transaction_id: &str,
        request: &ReviewActionRequest,
    ) -> Result<ReviewActionReceipt, ReviewApiError> {
        ReviewApiClient::record_review_action(self, transaction_id, request).await
    }

    async fn monitoring_summary(&self) -> Result<MonitoringSummary, ReviewApiError> {
        ReviewApiClient::monitoring_summary(self).await
    }

    async fn monitoring_score_buckets(&self) -> Result<Vec<ScoreBucket>, ReviewApiError> {
        ReviewApiClient::monitoring_score_buckets(self).await
    }

    async fn monitoring_top_merchants(
        &self,
        limit: u32,
    ) -> Result<Vec<TopMerchant>, ReviewApiError> {
        ReviewApiClient::monitoring_top_merchants(self, limit).await
    }
}

/// Fetches the three monitoring aggregates concurrently. The first failure
/// wins and the other results are dropped.
pub async fn load_monitoring<B>(
    backend: &B,
    merchant_limit: u32,
) -> Result<MonitoringSnapshot, ReviewApiError>
where
    B: ReviewBackend + ?Sized,
{
    let (summary, score_buckets, top_merchants) = tokio::try_join!(
        backend.monitoring_summary(),
        backend.monitoring_score_buckets(),
        backend.monitoring_top_merchants(merchant_limit),
    )?;
    Ok(MonitoringSnapshot {
        summary,
        score_buckets,
        top_merchants,
    })
}
