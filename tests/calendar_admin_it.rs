// crates.io
use color_eyre::Result;
// self
use calendar_access::{
	_preludet::*,
	access::{AccessControl, ShareRequest, TokenRequest},
	auth::{Actor, CalendarId, GuestPermission, PermissionLevel, TokenPermission},
	config::{AccessConfig, RateLimitRule, RateLimits},
	ext::{AuditAction, MemoryAuditSink},
	model::{CalendarDraft, SubscriptionSource, SubscriptionStatus},
};

async fn setup_with(config: AccessConfig) -> (AccessControl, MemoryAuditSink, CalendarId) {
	let (access, audit) = build_test_access(config);
	let calendar = access
		.create_calendar(
			&actor("olivia"),
			CalendarDraft::new("Shifts").color("#10b981").guest_permission(GuestPermission::Read),
		)
		.await
		.expect("Calendar fixture should be created.");

	(access, audit, calendar.id)
}

async fn setup() -> (AccessControl, MemoryAuditSink, CalendarId) {
	setup_with(AccessConfig::default()).await
}

#[tokio::test]
async fn creators_own_their_calendars() -> Result<()> {
	let (access, audit, calendar) = setup().await;

	assert_eq!(access.resolve(&actor("olivia"), &calendar, None).await?, PermissionLevel::Owner);
	assert_eq!(access.resolve(&Actor::Guest, &calendar, None).await?, PermissionLevel::Read);
	assert!(matches!(audit.events()[0].action, AuditAction::CalendarCreated));
	assert!(matches!(
		access.create_calendar(&Actor::Guest, CalendarDraft::new("Anon")).await,
		Err(Error::InsufficientPermission { .. })
	));

	Ok(())
}

#[tokio::test]
async fn calendar_creation_is_throttled_per_actor() -> Result<()> {
	let limits = RateLimits {
		calendar_creation: Some(RateLimitRule { max_requests: 2, window_secs: 60 }),
		..RateLimits::default()
	};
	let (access, _, _) =
		setup_with(AccessConfig { rate_limits: limits, ..AccessConfig::default() }).await;

	access.create_calendar(&actor("olivia"), CalendarDraft::new("Second")).await?;

	assert!(matches!(
		access.create_calendar(&actor("olivia"), CalendarDraft::new("Third")).await,
		Err(Error::RateLimited(_))
	));

	access.create_calendar(&actor("bob"), CalendarDraft::new("Bob's")).await?;

	Ok(())
}

#[tokio::test]
async fn guest_policy_changes_need_admin() -> Result<()> {
	let (access, audit, calendar) = setup().await;
	let owner = actor("olivia");

	access
		.share(&owner, ShareRequest::new(calendar.clone(), user("bob"), PermissionLevel::Write))
		.await?;

	assert!(matches!(
		access.set_guest_permission(&actor("bob"), &calendar, GuestPermission::Write).await,
		Err(Error::InsufficientPermission { required: PermissionLevel::Admin, .. })
	));

	let updated = access.set_guest_permission(&owner, &calendar, GuestPermission::Write).await?;

	assert_eq!(updated.guest_permission, GuestPermission::Write);

	let escalation = audit
		.events()
		.into_iter()
		.find(|event| matches!(event.action, AuditAction::GuestPermissionChanged { .. }))
		.expect("Guest policy change should be audited.");

	assert!(escalation.action.is_escalation());

	Ok(())
}

#[tokio::test]
async fn ownership_transfer_moves_the_owner_level() -> Result<()> {
	let (access, _, calendar) = setup().await;
	let owner = actor("olivia");

	access
		.share(&owner, ShareRequest::new(calendar.clone(), user("ada"), PermissionLevel::Admin))
		.await?;

	assert!(matches!(
		access.transfer_ownership(&actor("ada"), &calendar, &user("ada")).await,
		Err(Error::InsufficientPermission { required: PermissionLevel::Owner, .. })
	));

	let updated = access.transfer_ownership(&owner, &calendar, &user("ada")).await?;

	assert_eq!(updated.owner, Some(user("ada")));
	assert_eq!(access.resolve(&actor("ada"), &calendar, None).await?, PermissionLevel::Owner);
	assert_eq!(access.resolve(&owner, &calendar, None).await?, PermissionLevel::Read);
	assert!(access.list_shares(&actor("ada"), &calendar).await?.is_empty());

	Ok(())
}

#[tokio::test]
async fn deleting_a_calendar_drops_every_grant() -> Result<()> {
	let (access, _, calendar) = setup().await;
	let owner = actor("olivia");

	access
		.share(&owner, ShareRequest::new(calendar.clone(), user("bob"), PermissionLevel::Admin))
		.await?;

	let issued =
		access.issue_token(&owner, &calendar, TokenRequest::new(TokenPermission::Read)).await?;

	assert!(matches!(
		access.delete_calendar(&actor("bob"), &calendar).await,
		Err(Error::InsufficientPermission { .. })
	));

	access.delete_calendar(&owner, &calendar).await?;

	assert!(matches!(
		access.resolve(&actor("bob"), &calendar, None).await,
		Err(Error::NotFound { entity: "Calendar", .. })
	));
	assert!(matches!(
		access.validate_token(issued.secret().expose()).await,
		Err(Error::InvalidToken)
	));
	assert!(access.subscriptions(&user("bob")).await?.is_empty());

	Ok(())
}

#[tokio::test]
async fn removing_an_account_orphans_its_calendars() -> Result<()> {
	let (access, audit, calendar) = setup().await;
	let owner = actor("olivia");
	let other = access.create_calendar(&actor("bob"), CalendarDraft::new("Bob's")).await?;

	access
		.share(
			&actor("bob"),
			ShareRequest::new(other.id.clone(), user("olivia"), PermissionLevel::Read),
		)
		.await?;
	audit.take();

	let removal = access.remove_account(&user("olivia")).await?;

	assert_eq!(removal.orphaned, vec![calendar.clone()]);
	assert_eq!(removal.shares_removed, 1);
	assert_eq!(removal.subscriptions_removed, 1);
	assert_eq!(access.resolve(&owner, &other.id, None).await?, PermissionLevel::None);
	assert!(matches!(
		access.set_guest_permission(&owner, &calendar, GuestPermission::None).await,
		Err(Error::InsufficientPermission { .. })
	));
	assert!(audit.events().iter().any(|event| {
		event.calendar_id == calendar
			&& event.action
				== AuditAction::CalendarOrphaned { previous_owner: user("olivia") }
	}));

	Ok(())
}

#[tokio::test]
async fn exports_need_read_and_respect_the_limit() -> Result<()> {
	let limits = RateLimits {
		bulk_export: Some(RateLimitRule { max_requests: 1, window_secs: 60 }),
		..RateLimits::default()
	};
	let (access, _, calendar) =
		setup_with(AccessConfig { rate_limits: limits, ..AccessConfig::default() }).await;
	let owner = actor("olivia");

	access.set_guest_permission(&owner, &calendar, GuestPermission::None).await?;

	assert!(matches!(
		access.authorize_export(&Actor::Guest, &calendar, None).await,
		Err(Error::InsufficientPermission { required: PermissionLevel::Read, .. })
	));

	let issued =
		access.issue_token(&owner, &calendar, TokenRequest::new(TokenPermission::Read)).await?;
	let level =
		access.authorize_export(&Actor::Guest, &calendar, Some(issued.secret().expose())).await?;

	assert_eq!(level, PermissionLevel::Read);
	assert!(matches!(
		access.authorize_export(&Actor::Guest, &calendar, Some(issued.secret().expose())).await,
		Err(Error::RateLimited(_))
	));

	Ok(())
}

#[tokio::test]
async fn subscriptions_record_how_a_calendar_was_reached() -> Result<()> {
	let (access, _, calendar) = setup().await;
	let carol = user("carol");
	let record = access.subscribe(&carol, &calendar, None).await?;

	assert_eq!(record.source, SubscriptionSource::Guest);

	let dismissed = access.dismiss(&carol, &calendar).await?;

	assert_eq!(dismissed.status, SubscriptionStatus::Dismissed);

	let issued = access
		.issue_token(&actor("olivia"), &calendar, TokenRequest::new(TokenPermission::Write))
		.await?;
	let again = access.subscribe(&carol, &calendar, Some(issued.secret().expose())).await?;

	assert_eq!(again.source, SubscriptionSource::Token);
	assert!(again.is_subscribed());
	assert_eq!(access.subscriptions(&carol).await?.len(), 1);

	access.set_guest_permission(&actor("olivia"), &calendar, GuestPermission::None).await?;

	assert!(matches!(
		access.subscribe(&user("dave"), &calendar, None).await,
		Err(Error::InsufficientPermission { .. })
	));
	assert!(matches!(
		access.dismiss(&user("dave"), &calendar).await,
		Err(Error::NotFound { entity: "Subscription", .. })
	));

	Ok(())
}
