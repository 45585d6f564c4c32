//! Subscriber management for the core's event system.

use reqwest::Method;

use corax_core::{Subscriber, Subscription};

use crate::client::{CoraxClient, Result};

impl CoraxClient {
    /// All registered subscribers.
    pub async fn subscribers(&self) -> Result<Vec<Subscriber>> {
        self.get_json("/subscribers").await
    }

    /// Subscribers listening for a given event type.
    pub async fn subscribers_for_event(&self, event_type: &str) -> Result<Vec<Subscriber>> {
        self.get_json(&format!("/subscribers/for/{event_type}")).await
    }

    /// A single subscriber, or `None` if it is not registered.
    pub async fn subscriber(&self, subscriber_id: &str) -> Result<Option<Subscriber>> {
        let response = self
            .request(Method::GET, &format!("/subscriber/{subscriber_id}"))?
            .send()
            .await?;
        if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            Ok(None)
        }
    }

    /// Replace a subscriber's subscriptions.
    pub async fn update_subscriber(
        &self,
        subscriber_id: &str,
        subscriptions: &[Subscription],
    ) -> Result<Subscriber> {
        let req = self
            .request(Method::PUT, &format!("/subscriber/{subscriber_id}"))?
            .json(subscriptions);
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }

    /// Add a single subscription to a subscriber.
    pub async fn add_subscription(
        &self,
        subscriber_id: &str,
        subscription: &Subscription,
    ) -> Result<Subscriber> {
        let req = self
            .request(
                Method::POST,
                &format!("/subscriber/{subscriber_id}/{}", subscription.message_type),
            )?
            .query(&[
                ("timeout", subscription.timeout.to_string()),
                (
                    "wait_for_completion",
                    subscription.wait_for_completion.to_string(),
                ),
            ]);
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }

    /// Remove a single subscription from a subscriber.
    pub async fn delete_subscription(
        &self,
        subscriber_id: &str,
        subscription: &Subscription,
    ) -> Result<Subscriber> {
        let req = self.request(
            Method::DELETE,
            &format!("/subscriber/{subscriber_id}/{}", subscription.message_type),
        )?;
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_subscriber(&self, subscriber_id: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("/subscriber/{subscriber_id}"))?)
            .await?;
        Ok(())
    }
}
