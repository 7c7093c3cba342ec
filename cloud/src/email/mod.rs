//! Ticket confirmation email over SES

use async_trait::async_trait;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use shared::models::Order;

use crate::error::BoxError;

#[async_trait]
pub trait TicketMailer: Send + Sync {
    async fn send_ticket_confirmation(
        &self,
        order: &Order,
        event_title: &str,
    ) -> Result<(), BoxError>;
}

#[derive(Clone)]
pub struct SesMailer {
    client: aws_sdk_sesv2::Client,
    from: String,
}

impl SesMailer {
    pub fn new(client: aws_sdk_sesv2::Client, from: String) -> Self {
        Self { client, from }
    }
}

#[async_trait]
impl TicketMailer for SesMailer {
    async fn send_ticket_confirmation(
        &self,
        order: &Order,
        event_title: &str,
    ) -> Result<(), BoxError> {
        let lines: Vec<String> = order
            .price_categories
            .iter()
            .map(|line| format!("  {} x{} @ {}", line.name, line.quantity, line.price))
            .collect();

        let text = format!(
            "Hi {},\n\nYour order for {} is confirmed.\n\n{}\n\nTotal: {} {}\nReference: {}\n\nSee you there!",
            order.first_name,
            event_title,
            lines.join("\n"),
            order.currency,
            order.total_amount,
            order.reference,
        );

        let subject = Content::builder()
            .data(format!("Your tickets for {}", event_title))
            .build()?;
        let body_text = Content::builder().data(text).build()?;
        let message = Message::builder()
            .subject(subject)
            .body(Body::builder().text(body_text).build())
            .build();

        self.client
            .send_email()
            .from_email_address(&self.from)
            .destination(
                Destination::builder()
                    .to_addresses(&order.buyer_email)
                    .build(),
            )
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await?;

        tracing::info!(
            order_id = %order.id,
            email = %order.buyer_email,
            "ticket confirmation sent"
        );
        Ok(())
    }
}
