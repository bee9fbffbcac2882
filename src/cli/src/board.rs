//! Board state and the reducer that moves it forward.
//!
//! State is never mutated in place: every transition goes through
//! [`reduce`], which returns a fresh [`BoardState`]. The controller owns the
//! current state and the effects; this module only knows how an event
//! changes what the user sees.

use postboard_core::{Outpoint, PostRecord, Satoshis};

/// How a notification should be presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Something finished
    Success,
    /// Something happened
    Info,
    /// Something failed
    Error,
}

/// A transient message for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Presentation level
    pub level: NotificationLevel,
    /// Message text
    pub message: String,
}

impl Notification {
    fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Everything the presentation layer needs to draw the board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardState {
    /// Posts, newest first
    pub posts: Vec<PostRecord>,
    /// A lookup is in flight, or none has finished yet
    pub posts_loading: bool,
    /// A post is being created
    pub create_loading: bool,
    /// A post is being redeemed
    pub redeem_loading: bool,
    /// A tip is being sent
    pub tip_loading: bool,
    /// Notifications not yet shown
    pub notifications: Vec<Notification>,
}

impl Default for BoardState {
    fn default() -> Self {
        Self {
            posts: Vec::new(),
            posts_loading: true,
            create_loading: false,
            redeem_loading: false,
            tip_loading: false,
            notifications: Vec::new(),
        }
    }
}

impl BoardState {
    /// Finds a listed post by its token outpoint.
    pub fn find(&self, outpoint: &Outpoint) -> Option<&PostRecord> {
        self.posts.iter().find(|post| &post.outpoint() == outpoint)
    }

    /// True when any operation is in flight.
    pub fn is_busy(&self) -> bool {
        self.posts_loading || self.create_loading || self.redeem_loading || self.tip_loading
    }
}

/// Something that happened to the board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardEvent {
    /// A lookup started
    LoadStarted,
    /// A lookup finished; the posts replace the list
    LoadSucceeded(Vec<PostRecord>),
    /// A lookup failed; the list is kept
    LoadFailed(String),
    /// Post creation started
    CreateStarted,
    /// A post was accepted by the overlay
    PostCreated(PostRecord),
    /// Post creation failed
    CreateFailed(String),
    /// User input was rejected before any call was made
    ValidationFailed(String),
    /// Redemption started
    RedeemStarted,
    /// A post's token was spent
    PostRedeemed(Outpoint),
    /// Redemption failed
    RedeemFailed(String),
    /// A tip started
    TipStarted,
    /// A tip was sent
    TipSent {
        /// Recipient identity key
        recipient: String,
        /// Amount sent
        amount: Satoshis,
    },
    /// A tip failed
    TipFailed(String),
    /// A tip arrived and was accepted
    TipReceived {
        /// Sender identity key
        sender: String,
        /// Amount received
        amount: Satoshis,
    },
    /// Incoming tips could not be collected
    PaymentFailed(String),
    /// The presentation layer has shown the notifications
    NotificationsCleared,
}

/// Shortens an identity key for display.
pub fn short_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 12 {
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    } else {
        key.to_string()
    }
}

/// Applies `event` to `state`, returning the next state.
pub fn reduce(state: &BoardState, event: BoardEvent) -> BoardState {
    let mut next = state.clone();
    match event {
        BoardEvent::LoadStarted => {
            next.posts_loading = true;
        }
        BoardEvent::LoadSucceeded(posts) => {
            next.posts = posts;
            next.posts_loading = false;
        }
        BoardEvent::LoadFailed(message) => {
            next.posts_loading = false;
            next.notifications.push(Notification::error(format!(
                "Failed to load posts! Does the app have permission? Error: {}",
                message
            )));
        }
        BoardEvent::CreateStarted => {
            next.create_loading = true;
        }
        BoardEvent::PostCreated(record) => {
            next.create_loading = false;
            next.posts.insert(0, record);
            next.notifications.push(Notification::success("Post successfully created!"));
        }
        BoardEvent::CreateFailed(message) => {
            next.create_loading = false;
            next.notifications.push(Notification::error(message));
        }
        BoardEvent::ValidationFailed(message) => {
            next.notifications.push(Notification::error(message));
        }
        BoardEvent::RedeemStarted => {
            next.redeem_loading = true;
        }
        BoardEvent::PostRedeemed(outpoint) => {
            next.redeem_loading = false;
            if let Some(index) = next.posts.iter().position(|post| post.outpoint() == outpoint) {
                let removed = next.posts.remove(index);
                next.notifications.push(Notification::success(format!(
                    "Post redeemed, {} satoshis returned",
                    removed.sats
                )));
            }
        }
        BoardEvent::RedeemFailed(message) => {
            next.redeem_loading = false;
            next.notifications
                .push(Notification::error(format!("Error redeeming post: {}", message)));
        }
        BoardEvent::TipStarted => {
            next.tip_loading = true;
        }
        BoardEvent::TipSent { recipient, amount } => {
            next.tip_loading = false;
            next.notifications.push(Notification::success(format!(
                "Tipped {} satoshis to {}",
                amount,
                short_key(&recipient)
            )));
        }
        BoardEvent::TipFailed(message) => {
            next.tip_loading = false;
            next.notifications
                .push(Notification::error(format!("Error sending tip: {}", message)));
        }
        BoardEvent::TipReceived { sender, amount } => {
            next.notifications.push(Notification::info(format!(
                "You received a tip of {} satoshis from {}",
                amount,
                short_key(&sender)
            )));
        }
        BoardEvent::PaymentFailed(message) => {
            next.notifications
                .push(Notification::error(format!("Error receiving tips: {}", message)));
        }
        BoardEvent::NotificationsCleared => {
            next.notifications.clear();
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use postboard_core::{PostStatus, Script, TokenRef};

    fn record(txid: &str, post: &str) -> PostRecord {
        PostRecord {
            post: post.to_string(),
            sats: 1000,
            identity_key: "ab".repeat(32),
            token: TokenRef {
                txid: txid.to_string(),
                output_index: 0,
                locking_script: Script(vec![0xac]),
                satoshis: 1000,
            },
            status: PostStatus::Confirmed,
        }
    }

    #[test]
    fn test_initial_state_is_loading() {
        let state = BoardState::default();
        assert!(state.posts_loading);
        assert!(state.posts.is_empty());
        assert!(state.is_busy());
    }

    #[test]
    fn test_reduce_does_not_touch_input() {
        let state = BoardState::default();
        let next = reduce(&state, BoardEvent::LoadSucceeded(vec![record("a", "hello")]));
        assert!(state.posts.is_empty());
        assert!(state.posts_loading);
        assert_eq!(next.posts.len(), 1);
        assert!(!next.posts_loading);
    }

    #[test]
    fn test_created_posts_are_prepended() {
        let state = reduce(&BoardState::default(), BoardEvent::LoadSucceeded(vec![record("a", "old")]));
        let state = reduce(&state, BoardEvent::CreateStarted);
        assert!(state.create_loading);

        let state = reduce(&state, BoardEvent::PostCreated(record("b", "new")));
        assert!(!state.create_loading);
        assert_eq!(state.posts[0].post, "new");
        assert_eq!(state.posts[1].post, "old");
        assert_eq!(state.notifications.last().unwrap().level, NotificationLevel::Success);
    }

    #[test]
    fn test_load_failure_preserves_list() {
        let state = reduce(&BoardState::default(), BoardEvent::LoadSucceeded(vec![record("a", "kept")]));
        let state = reduce(&state, BoardEvent::LoadStarted);
        let state = reduce(&state, BoardEvent::LoadFailed("offline".to_string()));
        assert_eq!(state.posts.len(), 1);
        assert!(!state.posts_loading);
        assert!(state.notifications[0].message.contains("offline"));
    }

    #[test]
    fn test_load_replaces_list() {
        let state = reduce(&BoardState::default(), BoardEvent::PostCreated(record("a", "local")));
        let state = reduce(&state, BoardEvent::LoadSucceeded(vec![record("b", "remote")]));
        assert_eq!(state.posts.len(), 1);
        assert_eq!(state.posts[0].post, "remote");
    }

    #[test]
    fn test_redeem_removes_exactly_one() {
        let posts = vec![record("a", "first"), record("b", "second"), record("c", "third")];
        let state = reduce(&BoardState::default(), BoardEvent::LoadSucceeded(posts));
        let state = reduce(&state, BoardEvent::RedeemStarted);
        let state = reduce(&state, BoardEvent::PostRedeemed(Outpoint::new("b", 0)));
        assert!(!state.redeem_loading);
        let remaining: Vec<_> = state.posts.iter().map(|p| p.post.as_str()).collect();
        assert_eq!(remaining, vec!["first", "third"]);

        // Unknown outpoints change nothing but the loading flag
        let again = reduce(&state, BoardEvent::PostRedeemed(Outpoint::new("zz", 0)));
        assert_eq!(again.posts, state.posts);
    }

    #[test]
    fn test_failures_keep_posts() {
        let state = reduce(&BoardState::default(), BoardEvent::LoadSucceeded(vec![record("a", "x")]));
        for event in vec![
            BoardEvent::CreateFailed("boom".to_string()),
            BoardEvent::RedeemFailed("boom".to_string()),
            BoardEvent::TipFailed("boom".to_string()),
            BoardEvent::PaymentFailed("boom".to_string()),
            BoardEvent::ValidationFailed("Enter a post to share!".to_string()),
        ] {
            let next = reduce(&state, event);
            assert_eq!(next.posts, state.posts);
            assert_eq!(next.notifications.len(), 1);
            assert_eq!(next.notifications[0].level, NotificationLevel::Error);
        }
    }

    #[test]
    fn test_tips_notify_without_touching_posts() {
        let state = reduce(&BoardState::default(), BoardEvent::LoadSucceeded(vec![record("a", "x")]));
        let state = reduce(
            &state,
            BoardEvent::TipReceived {
                sender: "cd".repeat(32),
                amount: 42,
            },
        );
        assert_eq!(state.posts.len(), 1);
        assert!(state.notifications[0].message.contains("42"));

        let state = reduce(&state, BoardEvent::NotificationsCleared);
        assert!(state.notifications.is_empty());
    }

    #[test]
    fn test_short_key() {
        assert_eq!(short_key("abc"), "abc");
        assert_eq!(short_key(&"ab".repeat(32)), "ababab…abab");
    }
}
