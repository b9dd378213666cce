use sea_orm::{QueryFilter, SqlErr, prelude::*};

use crate::{
    Direction, EngineError, FundingEvent, FundingOutcome, ProviderEvent, ResultEngine,
    funding::parse_event,
    transactions::{self, NewLedgerEntry},
};

use super::Engine;

impl Engine {
    /// Verify, parse and apply a payment-provider delivery.
    ///
    /// The signature is checked over the raw body before anything is parsed.
    /// Deliveries are at least once: a reference that is already in the
    /// ledger, or that a concurrent delivery inserted first, resolves to
    /// [`FundingOutcome::Duplicate`] without touching the wallet.
    pub async fn reconcile_funding(
        &self,
        signature: &str,
        body: &[u8],
    ) -> ResultEngine<FundingOutcome> {
        let verifier = self.webhook.as_ref().ok_or_else(|| {
            EngineError::Unauthorized("webhook secret not configured".to_string())
        })?;
        if !verifier.verify(signature, body) {
            tracing::warn!("rejected webhook with invalid signature");
            return Err(EngineError::Unauthorized("invalid signature".to_string()));
        }

        match parse_event(body)? {
            ProviderEvent::Ignored { event, status } => {
                tracing::debug!(%event, %status, "ignoring provider event");
                Ok(FundingOutcome::Ignored)
            }
            ProviderEvent::Charge(event) => self.apply_funding(event).await,
        }
    }

    /// Credit a wallet from an already verified event.
    ///
    /// A unique violation only counts as a duplicate once a fresh read shows
    /// the reference committed. Any other collision (two first fundings
    /// racing to create the same wallet) is retried once, then propagated so
    /// the provider redelivers.
    pub async fn apply_funding(&self, event: FundingEvent) -> ResultEngine<FundingOutcome> {
        let reference = event.reference.clone();
        let mut retried = false;
        loop {
            match self.fund_once(event.clone()).await {
                Err(EngineError::Database(err))
                    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
                {
                    if self.reference_recorded(&reference).await? {
                        tracing::info!(%reference, "duplicate delivery lost the insert race");
                        return Ok(FundingOutcome::Duplicate { reference });
                    }
                    if retried {
                        return Err(EngineError::Database(err));
                    }
                    tracing::warn!(%reference, "funding collided with a concurrent write, retrying");
                    retried = true;
                }
                Ok(FundingOutcome::Duplicate { reference }) => {
                    tracing::info!(%reference, "duplicate delivery ignored");
                    return Ok(FundingOutcome::Duplicate { reference });
                }
                other => return other,
            }
        }
    }

    async fn reference_recorded(&self, reference: &str) -> ResultEngine<bool> {
        Ok(transactions::Entity::find()
            .filter(transactions::Column::Reference.eq(reference))
            .one(&self.database)
            .await?
            .is_some())
    }

    async fn fund_once(&self, event: FundingEvent) -> ResultEngine<FundingOutcome> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let FundingEvent {
                    reference,
                    amount,
                    user_id,
                    category,
                    description,
                } = event;

                let seen = transactions::Entity::find()
                    .filter(transactions::Column::Reference.eq(reference.as_str()))
                    .one(db_tx)
                    .await?
                    .is_some();
                if seen {
                    return Ok(FundingOutcome::Duplicate { reference });
                }

                match engine.require_user(db_tx, user_id).await {
                    Ok(_) => {}
                    Err(EngineError::KeyNotFound(_)) => {
                        return Err(EngineError::BadMetadata(format!(
                            "unknown user {user_id}"
                        )));
                    }
                    Err(err) => return Err(err),
                }

                engine.ensure_wallet(db_tx, user_id).await?;
                engine
                    .append_ledger(
                        db_tx,
                        &NewLedgerEntry {
                            user_id,
                            direction: Direction::Credit,
                            category,
                            amount,
                            reference: reference.clone(),
                            description,
                            created_at: engine.clock.now(),
                        },
                    )
                    .await?;
                engine.credit_wallet(db_tx, user_id, amount).await?;

                tracing::info!(user_id, %reference, amount = %amount, "wallet funded");
                Ok(FundingOutcome::Processed { user_id, amount })
            })
        })
        .await
    }
}
