//! Conversation reducer driving the booking dialogue.
//!
//! The reducer is synchronous: every storage read or write is described as an
//! [`Effect::Future`] whose result is fed back as an action. Replies to the
//! requester are effects too, so a reducer test can assert the state without
//! a transport.

use super::environment::ConversationEnvironment;
use super::types::{ConversationAction, ConversationSession, Draft, Step};
use chrono::Datelike;
use lakeside_core::availability::month_availability;
use lakeside_core::effect::Effect;
use lakeside_core::reducer::Reducer;
use lakeside_core::{
    BookingError, BookingId, Category, DayAvailability, NaiveDate, NewBooking, Outbound,
    ResourceId, SmallVec, UserId, smallvec,
};

/// Shortest accepted name, in characters
pub const MIN_NAME_CHARS: usize = 2;
/// Longest accepted name, in characters
pub const MAX_NAME_CHARS: usize = 100;
/// Fewest digits an accepted phone number carries
pub const MIN_PHONE_DIGITS: usize = 7;

type Effects = SmallVec<[Effect<ConversationAction>; 4]>;

/// Trimmed name if it has an acceptable length
#[must_use]
pub fn validate_name(input: &str) -> Option<String> {
    let name = input.trim();
    let chars = name.chars().count();
    (MIN_NAME_CHARS..=MAX_NAME_CHARS)
        .contains(&chars)
        .then(|| name.to_string())
}

/// Trimmed phone if it carries enough digits
#[must_use]
pub fn validate_phone(input: &str) -> Option<String> {
    let phone = input.trim();
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    (digits >= MIN_PHONE_DIGITS).then(|| phone.to_string())
}

/// Reducer for one requester's booking dialogue
#[derive(Clone, Debug, Default)]
pub struct ConversationReducer;

impl ConversationReducer {
    /// Creates a new conversation reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn reply(env: &ConversationEnvironment, to: UserId, message: Outbound) -> Effect<ConversationAction> {
        let notifier = env.notifier.clone();
        Effect::future(async move {
            notifier.send(to, message).await;
            None
        })
    }

    fn load_resources(env: &ConversationEnvironment, category: Category) -> Effect<ConversationAction> {
        let catalog = env.catalog.clone();
        Effect::future(async move {
            Some(match catalog.list_active(Some(category)).await {
                Ok(resources) => ConversationAction::ResourcesLoaded { category, resources },
                Err(e) => ConversationAction::LoadFailed(e),
            })
        })
    }

    fn load_calendar(
        env: &ConversationEnvironment,
        resource_id: ResourceId,
        year: i32,
        month: u32,
    ) -> Effect<ConversationAction> {
        let catalog = env.catalog.clone();
        let ledger = env.ledger.clone();
        Effect::future(async move {
            let resource = match catalog.get_resource(resource_id).await {
                Ok(resource) if resource.is_active => resource,
                Ok(_) | Err(BookingError::NotFound(_)) => {
                    return Some(ConversationAction::ResourceMissing(resource_id));
                },
                Err(e) => return Some(ConversationAction::LoadFailed(e)),
            };
            Some(match month_availability(ledger.as_ref(), resource_id, year, month).await {
                Ok(availability) => ConversationAction::CalendarLoaded { resource, availability },
                Err(e) => ConversationAction::LoadFailed(e),
            })
        })
    }

    fn submit(env: &ConversationEnvironment, booking: NewBooking) -> Effect<ConversationAction> {
        let ledger = env.ledger.clone();
        Effect::future(async move {
            let date = booking.date;
            let resource_id = booking.resource_id;
            let requester = booking.requester;
            match ledger.create_booking(booking).await {
                Ok(id) => {
                    metrics::counter!("bookings.created").increment(1);
                    tracing::info!(booking_id = %id, %resource_id, %date, %requester, "Booking submitted");
                    Some(ConversationAction::BookingSubmitted(id))
                },
                Err(error) => {
                    if matches!(error, BookingError::SlotTaken { .. }) {
                        metrics::counter!("bookings.slot_taken").increment(1);
                    }
                    tracing::info!(%resource_id, %date, %requester, %error, "Booking not stored");
                    Some(ConversationAction::BookingRejected { date, error })
                },
            }
        })
    }

    fn announce(env: &ConversationEnvironment, id: BookingId) -> Effect<ConversationAction> {
        let ledger = env.ledger.clone();
        let notifier = env.notifier.clone();
        Effect::future(async move {
            match ledger.get_details(id).await {
                Ok(details) => {
                    notifier
                        .notify_moderators(&Outbound::NewBookingAlert { details })
                        .await;
                },
                Err(e) => tracing::warn!(booking_id = %id, error = %e, "Cannot announce booking"),
            }
            None
        })
    }

    fn category_menu(env: &ConversationEnvironment, to: UserId) -> Effect<ConversationAction> {
        Self::reply(env, to, Outbound::ChooseCategory { categories: Category::ALL.to_vec() })
    }

    fn ignore(state: &ConversationSession, action: &ConversationAction) -> Effects {
        tracing::debug!(
            user = %state.user,
            step = state.step.as_str(),
            action = action.kind(),
            "Ignored action"
        );
        SmallVec::new()
    }

    fn select_day(
        state: &mut ConversationSession,
        date: NaiveDate,
        env: &ConversationEnvironment,
    ) -> Effects {
        let (Some(resource), Some(calendar)) = (&state.draft.resource, &state.draft.calendar) else {
            return SmallVec::new();
        };

        let selectable = date >= env.today()
            && calendar.status(date) == Some(DayAvailability::Available);

        if !selectable {
            return smallvec![
                Self::reply(env, state.user, Outbound::DateUnavailable { date }),
                Self::load_calendar(env, resource.id, calendar.year, calendar.month),
            ];
        }

        let resource_name = resource.name.clone();
        state.draft.date = Some(date);
        state.step = Step::EnteringName;
        smallvec![Self::reply(env, state.user, Outbound::AskName { resource_name, date })]
    }

    fn enter_text(
        state: &mut ConversationSession,
        text: &str,
        env: &ConversationEnvironment,
    ) -> Effects {
        match state.step {
            Step::EnteringName => {
                let Some(name) = validate_name(text) else {
                    return smallvec![Self::reply(env, state.user, Outbound::InvalidName)];
                };
                state.draft.name = Some(name);
                state.step = Step::EnteringPhone;
                smallvec![Self::reply(env, state.user, Outbound::AskPhone)]
            },
            Step::EnteringPhone => {
                let Some(phone) = validate_phone(text) else {
                    return smallvec![Self::reply(env, state.user, Outbound::InvalidPhone)];
                };
                let Draft { resource: Some(resource), date: Some(date), name: Some(name), .. } =
                    &state.draft
                else {
                    return SmallVec::new();
                };
                let price = resource.price_on(*date, &env.policy.weekend);
                let summary = Outbound::Summary {
                    resource_name: resource.name.clone(),
                    date: *date,
                    name: name.clone(),
                    phone: phone.clone(),
                    price,
                };
                state.draft.phone = Some(phone);
                state.draft.price = Some(price);
                state.step = Step::Confirming;
                smallvec![Self::reply(env, state.user, summary)]
            },
            _ => SmallVec::new(),
        }
    }

    fn confirm(state: &mut ConversationSession, env: &ConversationEnvironment) -> Effects {
        let user = state.user;
        let draft = std::mem::take(&mut state.draft);
        // The session is released before storage answers
        state.clear();

        match draft {
            Draft {
                resource: Some(resource),
                date: Some(date),
                name: Some(name),
                phone: Some(phone),
                ..
            } => smallvec![Self::submit(
                env,
                NewBooking { resource_id: resource.id, date, requester: user, name, phone },
            )],
            _ => {
                tracing::warn!(%user, "Confirmation with an incomplete draft");
                smallvec![Self::reply(env, user, Outbound::BookingFailed)]
            },
        }
    }
}

impl Reducer for ConversationReducer {
    type State = ConversationSession;
    type Action = ConversationAction;
    type Environment = ConversationEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut ConversationSession,
        action: ConversationAction,
        env: &ConversationEnvironment,
    ) -> Effects {
        match action {
            ConversationAction::Start { payload } => {
                state.clear();
                match payload.as_deref().and_then(Category::from_start_argument) {
                    Some(category) => smallvec![Self::load_resources(env, category)],
                    None => smallvec![Self::category_menu(env, state.user)],
                }
            },

            ConversationAction::SelectCategory(category) if state.step.is_browsing() => {
                smallvec![Self::load_resources(env, category)]
            },

            ConversationAction::ResourcesLoaded { category, resources }
                if state.step.is_browsing() =>
            {
                if resources.is_empty() {
                    return smallvec![Self::reply(env, state.user, Outbound::NoResources { category })];
                }
                state.step = Step::CategorySelected;
                state.draft = Draft { category: Some(category), ..Draft::default() };
                smallvec![Self::reply(env, state.user, Outbound::ResourceList { category, resources })]
            },

            ConversationAction::SelectResource(resource_id)
                if matches!(state.step, Step::CategorySelected | Step::ResourceSelected) =>
            {
                let (year, month) = env.current_month();
                smallvec![Self::load_calendar(env, resource_id, year, month)]
            },

            ConversationAction::ShowMonth { year, month } if state.step == Step::ResourceSelected => {
                let Some(resource) = &state.draft.resource else {
                    return SmallVec::new();
                };
                if !(1..=12).contains(&month) {
                    return SmallVec::new();
                }
                let (year, month) = (year, month).max(env.current_month());
                smallvec![Self::load_calendar(env, resource.id, year, month)]
            },

            ConversationAction::CalendarLoaded { resource, availability }
                if matches!(state.step, Step::CategorySelected | Step::ResourceSelected) =>
            {
                let can_go_back = (availability.year, availability.month) > env.current_month();
                state.step = Step::ResourceSelected;
                state.draft = Draft {
                    category: Some(resource.category),
                    resource: Some(resource.clone()),
                    calendar: Some(availability.clone()),
                    ..Draft::default()
                };
                smallvec![Self::reply(
                    env,
                    state.user,
                    Outbound::Calendar { resource, availability, can_go_back },
                )]
            },

            ConversationAction::ResourceMissing(resource_id) => {
                smallvec![Self::reply(env, state.user, Outbound::ResourceUnavailable { resource_id })]
            },

            ConversationAction::SelectDay(date) if state.step == Step::ResourceSelected => {
                Self::select_day(state, date, env)
            },

            ConversationAction::Text(text) => Self::enter_text(state, &text, env),

            ConversationAction::Confirm if state.step == Step::Confirming => Self::confirm(state, env),

            ConversationAction::Cancel if state.step != Step::Idle => {
                state.clear();
                smallvec![Self::reply(env, state.user, Outbound::Cancelled)]
            },

            ConversationAction::BookingSubmitted(booking_id) => smallvec![
                Self::reply(env, state.user, Outbound::BookingSubmitted { booking_id }),
                Self::announce(env, booking_id),
            ],

            // Back to the same resource's calendar, on the month of the lost day
            ConversationAction::BookingRejected { date, error } => match error {
                BookingError::SlotTaken { resource_id, .. } => {
                    state.step = Step::CategorySelected;
                    smallvec![
                        Self::reply(env, state.user, Outbound::DateTaken { date }),
                        Self::load_calendar(env, resource_id, date.year(), date.month()),
                    ]
                },
                _ => smallvec![Self::reply(env, state.user, Outbound::BookingFailed)],
            },

            ConversationAction::LoadFailed(error) => {
                tracing::warn!(user = %state.user, step = state.step.as_str(), %error, "Read failed");
                smallvec![Self::reply(env, state.user, Outbound::BookingFailed)]
            },

            other => Self::ignore(state, &other),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::conversation::environment::BookingPolicy;
    use crate::notifications::NotificationDispatcher;
    use chrono::FixedOffset;
    use lakeside_core::availability::compute_month;
    use lakeside_core::environment::Clock;
    use lakeside_core::{
        Booking, BookingStatus, MonthAvailability, ReservableResource, UserId, WeekendDays,
    };
    use lakeside_testing::assertions::{
        assert_effects_count, assert_has_future_effect, assert_no_effects,
    };
    use lakeside_testing::{
        InMemoryBookingStore, RecordingTransport, ReducerTest, StaticModerators, test_clock,
    };
    use std::sync::Arc;

    const USER: UserId = UserId::new(10);

    fn env() -> ConversationEnvironment {
        let clock = Arc::new(test_clock());
        let store = Arc::new(InMemoryBookingStore::seeded(clock.clone()));
        let notifier = NotificationDispatcher::new(
            Arc::new(RecordingTransport::new()),
            Arc::new(StaticModerators::new([UserId::new(900)])),
        );
        ConversationEnvironment::new(
            clock,
            store.clone(),
            store,
            notifier,
            BookingPolicy::new(WeekendDays::default(), FixedOffset::east_opt(0).unwrap()),
        )
    }

    fn gazebo() -> ReservableResource {
        ReservableResource {
            id: ResourceId::new(1),
            name: "Small gazebo #1".to_string(),
            category: Category::FishingGazebo,
            capacity: 6,
            weekday_price: 2000,
            weekend_price: 3000,
            description: String::new(),
            is_active: true,
            sort_order: 10,
        }
    }

    fn july(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
    }

    fn july_calendar() -> MonthAvailability {
        let pending = Booking {
            id: BookingId::new(1),
            resource_id: ResourceId::new(1),
            booking_date: july(12),
            user_id: UserId::new(99),
            user_name: "Other".to_string(),
            user_phone: "79000000000".to_string(),
            status: BookingStatus::Pending,
            created_at: test_clock().now(),
            updated_at: test_clock().now(),
            moderator_id: None,
        };
        compute_month(ResourceId::new(1), 2025, 7, &[pending]).unwrap()
    }

    fn session(step: Step) -> ConversationSession {
        let mut session = ConversationSession::from(USER);
        session.step = step;
        session.draft = Draft {
            category: Some(Category::FishingGazebo),
            resource: Some(gazebo()),
            calendar: Some(july_calendar()),
            ..Draft::default()
        };
        session
    }

    fn session_with_date(step: Step, date: NaiveDate) -> ConversationSession {
        let mut session = session(step);
        session.draft.date = Some(date);
        if step == Step::EnteringPhone || step == Step::Confirming {
            session.draft.name = Some("Anna".to_string());
        }
        if step == Step::Confirming {
            session.draft.phone = Some("79001234567".to_string());
            session.draft.price = Some(2000);
        }
        session
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Anna "), Some("Anna".to_string()));
        assert_eq!(validate_name("A"), None);
        assert_eq!(validate_name("   "), None);
        assert_eq!(validate_name("Ян"), Some("Ян".to_string()));
        assert!(validate_name(&"x".repeat(100)).is_some());
        assert!(validate_name(&"x".repeat(101)).is_none());
        // Counted in characters, not bytes
        assert!(validate_name(&"ё".repeat(100)).is_some());
    }

    #[test]
    fn test_validate_phone() {
        assert_eq!(validate_phone("+7 (900) 123-45-67"), Some("+7 (900) 123-45-67".to_string()));
        assert_eq!(validate_phone(" 79001234567 "), Some("79001234567".to_string()));
        assert_eq!(validate_phone("123456"), None);
        assert_eq!(validate_phone("phone: 12-34-56"), None);
    }

    #[test]
    fn test_start_clears_draft_and_offers_categories() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(session_with_date(Step::EnteringPhone, july(10)))
            .when_action(ConversationAction::Start { payload: None })
            .then_state(|s| assert!(s.is_idle()))
            .then_effects(|effects| assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn test_start_with_deep_link_loads_category() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(ConversationSession::from(USER))
            .when_action(ConversationAction::Start { payload: Some("site_house".to_string()) })
            .then_state(|s| assert_eq!(s.step, Step::Idle))
            .then_effects(|effects| assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn test_resources_loaded_moves_to_category_selected() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(ConversationSession::from(USER))
            .when_action(ConversationAction::ResourcesLoaded {
                category: Category::FishingGazebo,
                resources: vec![gazebo()],
            })
            .then_state(|s| {
                assert_eq!(s.step, Step::CategorySelected);
                assert_eq!(s.draft.category, Some(Category::FishingGazebo));
            })
            .run();
    }

    #[test]
    fn test_empty_category_keeps_idle() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(ConversationSession::from(USER))
            .when_action(ConversationAction::ResourcesLoaded {
                category: Category::Cabin,
                resources: Vec::new(),
            })
            .then_state(|s| assert!(s.is_idle()))
            .then_effects(|effects| assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn test_select_resource_ignored_when_idle() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(ConversationSession::from(USER))
            .when_action(ConversationAction::SelectResource(ResourceId::new(1)))
            .then_state(|s| assert!(s.is_idle()))
            .then_effects(assert_no_effects)
            .run();
    }

    #[test]
    fn test_calendar_loaded_moves_to_resource_selected() {
        let mut browsing = ConversationSession::from(USER);
        browsing.step = Step::CategorySelected;

        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(browsing)
            .when_action(ConversationAction::CalendarLoaded {
                resource: gazebo(),
                availability: july_calendar(),
            })
            .then_state(|s| {
                assert_eq!(s.step, Step::ResourceSelected);
                assert_eq!(s.draft.resource.as_ref().map(|r| r.id), Some(ResourceId::new(1)));
                assert_eq!(s.draft.calendar.as_ref().map(|c| c.month), Some(7));
            })
            .then_effects(|effects| assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn test_invalid_month_is_ignored() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(session(Step::ResourceSelected))
            .when_action(ConversationAction::ShowMonth { year: 2025, month: 13 })
            .then_effects(assert_no_effects)
            .run();
    }

    #[test]
    fn test_available_day_moves_to_entering_name() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(session(Step::ResourceSelected))
            .when_action(ConversationAction::SelectDay(july(10)))
            .then_state(|s| {
                assert_eq!(s.step, Step::EnteringName);
                assert_eq!(s.draft.date, Some(july(10)));
            })
            .then_effects(|effects| assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn test_pending_day_is_rejected_and_calendar_rerendered() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(session(Step::ResourceSelected))
            .when_action(ConversationAction::SelectDay(july(12)))
            .then_state(|s| {
                assert_eq!(s.step, Step::ResourceSelected);
                assert_eq!(s.draft.date, None);
            })
            .then_effects(|effects| assert_effects_count(effects, 2))
            .run();
    }

    #[test]
    fn test_day_outside_rendered_month_is_rejected() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(session(Step::ResourceSelected))
            .when_action(ConversationAction::SelectDay(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()))
            .then_state(|s| assert_eq!(s.step, Step::ResourceSelected))
            .run();
    }

    #[test]
    fn test_past_day_is_rejected() {
        let mut past = session(Step::ResourceSelected);
        past.draft.calendar = Some(compute_month(ResourceId::new(1), 2024, 12, &[]).unwrap());

        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(past)
            .when_action(ConversationAction::SelectDay(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()))
            .then_state(|s| {
                assert_eq!(s.step, Step::ResourceSelected);
                assert_eq!(s.draft.date, None);
            })
            .run();
    }

    #[test]
    fn test_short_name_reprompts() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(session_with_date(Step::EnteringName, july(10)))
            .when_action(ConversationAction::Text("A".to_string()))
            .then_state(|s| {
                assert_eq!(s.step, Step::EnteringName);
                assert_eq!(s.draft.name, None);
            })
            .then_effects(|effects| assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn test_valid_name_moves_to_phone() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(session_with_date(Step::EnteringName, july(10)))
            .when_action(ConversationAction::Text("  Anna ".to_string()))
            .then_state(|s| {
                assert_eq!(s.step, Step::EnteringPhone);
                assert_eq!(s.draft.name.as_deref(), Some("Anna"));
            })
            .run();
    }

    #[test]
    fn test_short_phone_reprompts() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(session_with_date(Step::EnteringPhone, july(10)))
            .when_action(ConversationAction::Text("123456".to_string()))
            .then_state(|s| {
                assert_eq!(s.step, Step::EnteringPhone);
                assert_eq!(s.draft.phone, None);
            })
            .run();
    }

    #[test]
    fn test_formatted_phone_advances_with_weekday_price() {
        // 2025-07-08 is a Tuesday
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(session_with_date(Step::EnteringPhone, july(8)))
            .when_action(ConversationAction::Text("+7 (900) 123-45-67".to_string()))
            .then_state(|s| {
                assert_eq!(s.step, Step::Confirming);
                assert_eq!(s.draft.phone.as_deref(), Some("+7 (900) 123-45-67"));
                assert_eq!(s.draft.price, Some(2000));
            })
            .run();
    }

    #[test]
    fn test_saturday_uses_weekend_price() {
        // 2025-07-05 is a Saturday
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(session_with_date(Step::EnteringPhone, july(5)))
            .when_action(ConversationAction::Text("79001234567".to_string()))
            .then_state(|s| assert_eq!(s.draft.price, Some(3000)))
            .run();
    }

    #[test]
    fn test_text_ignored_while_browsing() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(session(Step::ResourceSelected))
            .when_action(ConversationAction::Text("Anna".to_string()))
            .then_state(|s| assert_eq!(s.step, Step::ResourceSelected))
            .then_effects(assert_no_effects)
            .run();
    }

    #[test]
    fn test_confirm_clears_session_and_submits() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(session_with_date(Step::Confirming, july(10)))
            .when_action(ConversationAction::Confirm)
            .then_state(|s| assert!(s.is_idle()))
            .then_effects(|effects| assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn test_confirm_outside_confirming_is_ignored() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(session_with_date(Step::EnteringPhone, july(10)))
            .when_action(ConversationAction::Confirm)
            .then_state(|s| assert_eq!(s.step, Step::EnteringPhone))
            .then_effects(assert_no_effects)
            .run();
    }

    #[test]
    fn test_cancel_from_any_step_returns_to_idle() {
        for step in [
            Step::CategorySelected,
            Step::ResourceSelected,
            Step::EnteringName,
            Step::EnteringPhone,
            Step::Confirming,
        ] {
            ReducerTest::new(ConversationReducer::new())
                .with_env(env())
                .given_state(session_with_date(step, july(10)))
                .when_action(ConversationAction::Cancel)
                .then_state(|s| assert!(s.is_idle()))
                .then_effects(|effects| assert_effects_count(effects, 1))
                .run();
        }
    }

    #[test]
    fn test_cancel_when_idle_is_ignored() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(ConversationSession::from(USER))
            .when_action(ConversationAction::Cancel)
            .then_effects(assert_no_effects)
            .run();
    }

    fn slot_taken(date: NaiveDate) -> ConversationAction {
        ConversationAction::BookingRejected {
            date,
            error: BookingError::SlotTaken { resource_id: ResourceId::new(1), date },
        }
    }

    #[test]
    fn test_slot_taken_reloads_the_same_calendar() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(ConversationSession::from(USER))
            .when_action(slot_taken(july(12)))
            .then_state(|s| {
                assert_eq!(s.step, Step::CategorySelected);
                assert!(s.draft.date.is_none());
            })
            .then_effects(|effects| {
                assert_effects_count(effects, 2);
                assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_calendar_after_slot_taken_allows_another_day() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(ConversationSession::from(USER))
            .given_action(slot_taken(july(12)))
            .given_action(ConversationAction::CalendarLoaded {
                resource: gazebo(),
                availability: july_calendar(),
            })
            .when_action(ConversationAction::SelectDay(july(14)))
            .then_state(|s| {
                assert_eq!(s.step, Step::EnteringName);
                assert_eq!(s.draft.resource.as_ref().map(|r| r.id), Some(ResourceId::new(1)));
                assert_eq!(s.draft.date, Some(july(14)));
            })
            .run();
    }

    #[test]
    fn test_full_capture_sequence() {
        ReducerTest::new(ConversationReducer::new())
            .with_env(env())
            .given_state(session(Step::ResourceSelected))
            .given_action(ConversationAction::SelectDay(july(10)))
            .given_action(ConversationAction::Text("Anna".to_string()))
            .when_action(ConversationAction::Text("79001234567".to_string()))
            .then_state(|s| {
                assert_eq!(s.step, Step::Confirming);
                assert_eq!(s.draft.date, Some(july(10)));
                assert_eq!(s.draft.name.as_deref(), Some("Anna"));
                assert_eq!(s.draft.price, Some(2000));
            })
            .run();
    }

    mod validation {
        use super::super::{MAX_NAME_CHARS, MIN_NAME_CHARS, MIN_PHONE_DIGITS, validate_name, validate_phone};
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn names_are_trimmed_and_bounded(name in "[a-zA-Z ]{0,120}") {
                match validate_name(&name) {
                    Some(accepted) => {
                        prop_assert_eq!(accepted.as_str(), name.trim());
                        prop_assert!((MIN_NAME_CHARS..=MAX_NAME_CHARS).contains(&accepted.chars().count()));
                    },
                    None => {
                        let len = name.trim().chars().count();
                        prop_assert!(!(MIN_NAME_CHARS..=MAX_NAME_CHARS).contains(&len));
                    },
                }
            }

            #[test]
            fn phones_need_enough_digits(phone in "[0-9 +()-]{0,20}") {
                let digits = phone.chars().filter(char::is_ascii_digit).count();
                prop_assert_eq!(validate_phone(&phone).is_some(), digits >= MIN_PHONE_DIGITS);
            }
        }
    }
}
