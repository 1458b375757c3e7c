//! Telegram Bot channel: long polling + message sending via Bot API.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::Stream;
use gridwatch_core::config::TelegramConfig;
use gridwatch_core::{ChatTransport, GridWatchError, IncomingMessage, ReplyKeyboard, Result, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot channel. Shared behind an `Arc`: replies and notifications go
/// through `ChatTransport`, while `start_polling` feeds incoming messages.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    api_base: String,
    last_update_id: AtomicI64,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            api_base: API_BASE.to_string(),
            last_update_id: AtomicI64::new(0),
        }
    }

    /// Point the channel at another Bot API host (local test servers).
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.config.bot_token, method)
    }

    /// Get updates using long polling.
    pub async fn get_updates(&self) -> Result<Vec<TelegramUpdate>> {
        let offset = self.last_update_id.load(Ordering::SeqCst) + 1;
        let response = self
            .client
            .get(self.api_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", "30".into()),
                ("allowed_updates", "[\"message\"]".into()),
            ])
            .send()
            .await
            .map_err(|e| GridWatchError::Channel(format!("Telegram getUpdates failed: {e}")))?;

        let body: TelegramApiResponse<Vec<TelegramUpdate>> = response
            .json()
            .await
            .map_err(|e| GridWatchError::Channel(format!("Invalid Telegram response: {e}")))?;

        if !body.ok {
            return Err(GridWatchError::Channel(format!(
                "Telegram API error: {}",
                body.description.unwrap_or_default()
            )));
        }

        let updates = body.result.unwrap_or_default();
        if let Some(last) = updates.last() {
            self.last_update_id.store(last.update_id, Ordering::SeqCst);
        }
        Ok(updates)
    }

    /// Send a Markdown text message, optionally with a reply keyboard.
    pub async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<&ReplyKeyboard>) -> Result<()> {
        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&message_body(chat_id, text, keyboard))
            .send()
            .await
            .map_err(|e| GridWatchError::Channel(format!("sendMessage failed: {e}")))?;

        let result: TelegramApiResponse<Value> = response
            .json()
            .await
            .map_err(|e| GridWatchError::Channel(format!("Invalid send response: {e}")))?;

        if !result.ok {
            return Err(GridWatchError::Channel(format!(
                "Send failed: {}",
                result.description.unwrap_or_default()
            )));
        }
        Ok(())
    }

    /// Send typing indicator.
    pub async fn send_chat_action(&self, chat_id: i64) -> Result<()> {
        let body = json!({
            "chat_id": chat_id,
            "action": "typing",
        });
        let _ = self
            .client
            .post(self.api_url("sendChatAction"))
            .json(&body)
            .send()
            .await;
        Ok(())
    }

    /// Get bot info.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| GridWatchError::Channel(format!("getMe failed: {e}")))?;
        let body: TelegramApiResponse<TelegramUser> = response
            .json()
            .await
            .map_err(|e| GridWatchError::Channel(format!("Invalid getMe response: {e}")))?;
        body.result.ok_or_else(|| {
            GridWatchError::Channel(format!(
                "No bot info: {}",
                body.description.unwrap_or_default()
            ))
        })
    }

    /// Start polling loop: returns a stream of IncomingMessages.
    /// The loop ends when the stream is dropped.
    pub fn start_polling(self: Arc<Self>) -> TelegramPollingStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let channel = self;
            tracing::info!("📡 Telegram polling loop started");

            loop {
                match channel.get_updates().await {
                    Ok(updates) => {
                        for update in updates {
                            if let Some(msg) = update.to_incoming()
                                && tx.send(msg).is_err()
                            {
                                tracing::info!("📡 Telegram polling stopped (receiver dropped)");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("❌ Telegram polling error: {e}");
                        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                    }
                }

                if tx.is_closed() {
                    return;
                }
                tokio::time::sleep(tokio::time::Duration::from_secs(channel.config.poll_interval)).await;
            }
        });

        TelegramPollingStream { rx }
    }
}

/// `sendMessage` payload. Keyboards are persistent reply keyboards.
pub fn message_body(chat_id: i64, text: &str, keyboard: Option<&ReplyKeyboard>) -> Value {
    let mut body = json!({
        "chat_id": chat_id,
        "text": text,
        "parse_mode": "Markdown",
    });
    if let Some(kb) = keyboard {
        let rows: Vec<Vec<Value>> = kb
            .rows
            .iter()
            .map(|row| row.iter().map(|label| json!({ "text": label })).collect())
            .collect();
        body["reply_markup"] = json!({
            "keyboard": rows,
            "resize_keyboard": kb.resize,
            "one_time_keyboard": kb.one_time,
        });
    }
    body
}

/// Stream of incoming Telegram messages from polling.
pub struct TelegramPollingStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<IncomingMessage>,
}

impl Stream for TelegramPollingStream {
    type Item = IncomingMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[async_trait]
impl ChatTransport for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_message(&self, user_id: UserId, text: &str, keyboard: Option<&ReplyKeyboard>) -> Result<()> {
        self.send_text(user_id, text, keyboard).await
    }

    async fn send_typing(&self, user_id: UserId) -> Result<()> {
        self.send_chat_action(user_id).await
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
    pub date: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
}

impl TelegramUpdate {
    /// Text messages from humans only.
    pub fn to_incoming(&self) -> Option<IncomingMessage> {
        let msg = self.message.as_ref()?;
        let text = msg.text.as_ref()?;
        let from = msg.from.as_ref()?;

        if from.is_bot {
            return None;
        }

        Some(IncomingMessage {
            channel: "telegram".into(),
            chat_id: msg.chat.id,
            sender_name: Some(format!(
                "{}{}",
                from.first_name,
                from.last_name.as_deref().map(|l| format!(" {l}")).unwrap_or_default()
            )),
            content: text.clone(),
            timestamp: chrono::DateTime::from_timestamp(msg.date, 0).unwrap_or_else(chrono::Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn channel(base: &str) -> TelegramChannel {
        TelegramChannel::new(TelegramConfig {
            bot_token: "123:abc".into(),
            ..Default::default()
        })
        .with_api_base(base)
    }

    /// Answer one request with `body`; returns the base URL and the raw request.
    async fn bot_api_once(body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (format!("http://{addr}"), handle)
    }

    /// Read headers plus a `Content-Length` body.
    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if data.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).into_owned()
    }

    #[test]
    fn test_message_body_with_keyboard() {
        let kb = ReplyKeyboard::new(vec![vec!["Check GolemSP Status".into()]]);
        let body = message_body(42, "hi", Some(&kb));
        assert_eq!(body["chat_id"], 42);
        assert_eq!(body["parse_mode"], "Markdown");
        assert_eq!(body["reply_markup"]["keyboard"][0][0]["text"], "Check GolemSP Status");
        assert_eq!(body["reply_markup"]["resize_keyboard"], true);
        assert_eq!(body["reply_markup"]["one_time_keyboard"], false);

        assert!(message_body(42, "hi", None).get("reply_markup").is_none());
    }

    #[test]
    fn test_update_to_incoming() {
        let update: TelegramUpdate = serde_json::from_value(json!({
            "update_id": 10,
            "message": {
                "message_id": 1,
                "from": {"id": 7, "is_bot": false, "first_name": "Ada", "last_name": "L"},
                "chat": {"id": 7, "type": "private"},
                "text": "/status",
                "date": 1_700_000_000
            }
        }))
        .unwrap();
        let msg = update.to_incoming().unwrap();
        assert_eq!(msg.chat_id, 7);
        assert_eq!(msg.content, "/status");
        assert_eq!(msg.sender_name.as_deref(), Some("Ada L"));
        assert_eq!(msg.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_bot_and_non_text_updates_skipped() {
        let from_bot: TelegramUpdate = serde_json::from_value(json!({
            "update_id": 11,
            "message": {
                "message_id": 2,
                "from": {"id": 9, "is_bot": true, "first_name": "bot"},
                "chat": {"id": 9, "type": "private"},
                "text": "hello",
                "date": 0
            }
        }))
        .unwrap();
        assert!(from_bot.to_incoming().is_none());

        let no_message = TelegramUpdate {
            update_id: 12,
            message: None,
        };
        assert!(no_message.to_incoming().is_none());
    }

    #[tokio::test]
    async fn test_send_text_posts_to_bot_api() {
        let (base, request) = bot_api_once(r#"{"ok":true,"result":{}}"#).await;
        channel(&base).send_text(5, "*hi*", None).await.unwrap();

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /bot123:abc/sendMessage"));
        assert!(request.contains("\"chat_id\":5"));
    }

    #[tokio::test]
    async fn test_send_text_api_error() {
        let (base, _request) = bot_api_once(r#"{"ok":false,"description":"Forbidden: bot was blocked by the user"}"#).await;
        let err = channel(&base).send_text(5, "hi", None).await.unwrap_err();
        assert!(matches!(err, GridWatchError::Channel(msg) if msg.contains("blocked")));
    }

    #[tokio::test]
    async fn test_get_updates_advances_offset() {
        let (base, _request) = bot_api_once(
            r#"{"ok":true,"result":[{"update_id":41,"message":null},{"update_id":42,"message":null}]}"#,
        )
        .await;
        let ch = channel(&base);
        let updates = ch.get_updates().await.unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(ch.last_update_id.load(Ordering::SeqCst), 42);
    }
}
