mod common;

use comment_sieve::aggregate::{AggregationPolicy, Aggregator, Verdict};
use comment_sieve::config::{Config, ValidatorConfig};
use comment_sieve::score::Score;
use comment_sieve::store::ModerationStore;
use comment_sieve::validators::ValidatorChain;
use comment_sieve::validators::banned_ip::BannedIpValidator;
use comment_sieve::validators::blacklist::BlacklistValidator;
use comment_sieve::validators::link_limit::LinkLimitValidator;
use comment_sieve::{Comment, Moderator, RequestContext};
use common::{memory_store, store_with_phrases};

fn from(ip: &str, text: &str) -> Comment {
    Comment {
        text: text.into(),
        ip_address: ip.into(),
        ..Comment::default()
    }
}

#[tokio::test]
async fn held_comments_raise_later_scores() {
    let store = memory_store().await;
    let chain = ValidatorChain::new()
        .add_validator(Box::new(BannedIpValidator::default()))
        .add_validator(Box::new(LinkLimitValidator::default()));
    let moderator =
        Moderator::new(chain, Aggregator::default(), store.clone()).with_history(true);
    let request = RequestContext::default();

    let first = moderator
        .moderate(&from("192.0.2.8", "see http://a.example and http://b.example"), &request)
        .await;
    assert_eq!(first.verdict, Verdict::Hold);
    assert!(!first.is_public());
    assert_eq!(store.count_held("192.0.2.8").await.unwrap(), 1);

    let second = moderator.moderate(&from("192.0.2.8", "plain words"), &request).await;
    assert_eq!(second.scores, vec![("ip", Score::new(0.1))]);

    let elsewhere = moderator.moderate(&from("192.0.2.9", "plain words"), &request).await;
    assert!(elsewhere.scores.is_empty());
    assert!(elsewhere.is_public());
}

#[tokio::test]
async fn rejected_comments_are_not_recorded() {
    let store = store_with_phrases(&["viagra"]).await;
    let chain = ValidatorChain::new().add_validator(Box::new(BlacklistValidator::default()));
    let moderator =
        Moderator::new(chain, Aggregator::default(), store.clone()).with_history(true);

    let decision = moderator
        .moderate(&from("192.0.2.8", "viagra"), &RequestContext::default())
        .await;
    assert!(decision.is_rejected());
    assert_eq!(store.count_held("192.0.2.8").await.unwrap(), 0);
}

#[tokio::test]
async fn history_disabled() {
    let store = memory_store().await;
    let chain = ValidatorChain::new().add_validator(Box::new(LinkLimitValidator::default()));
    let moderator = Moderator::new(chain, Aggregator::default(), store.clone());

    moderator
        .moderate(
            &from("192.0.2.8", "http://a http://b http://c"),
            &RequestContext::default(),
        )
        .await;
    assert_eq!(store.count_held("192.0.2.8").await.unwrap(), 0);
}

#[tokio::test]
async fn aggregation_policies() {
    let store = store_with_phrases(&["casino"]).await;
    let text = "casino http://a http://b";
    let chain = || {
        ValidatorChain::new()
            .add_validator(Box::new(BlacklistValidator::default()))
            .add_validator(Box::new(LinkLimitValidator::default()))
    };

    let mean = Moderator::new(
        chain(),
        Aggregator::new(AggregationPolicy::Mean, 0.1, 0.9),
        store.clone(),
    );
    let decision = mean.moderate(&Comment::with_text(text), &RequestContext::default()).await;
    assert_eq!(decision.score, Score::new(0.6));
    assert_eq!(decision.verdict, Verdict::Hold);

    let max = Moderator::new(
        chain(),
        Aggregator::new(AggregationPolicy::Max, 0.1, 0.9),
        store.clone(),
    );
    let decision = max.moderate(&Comment::with_text(text), &RequestContext::default()).await;
    assert_eq!(decision.score, Score::SPAM);
    assert_eq!(decision.verdict, Verdict::Reject);
}

#[test]
fn from_config_imports_blacklist_source() {
    let dir = tempfile::tempdir().unwrap();
    let seed = dir.path().join("blacklists.toml");
    std::fs::write(
        &seed,
        "[[blacklist]]\nname = \"pharmacy\"\nphrases = [\"cheap pills\"]\n",
    )
    .unwrap();

    let cfg = Config {
        validators: Some(vec![
            ValidatorConfig::named("blacklist"),
            ValidatorConfig::named("link_limit"),
        ]),
        blacklist_source: Some(seed.to_string_lossy().into_owned()),
        link_threshold: 2,
        ..Config::default()
    };

    tokio_test::block_on(async {
        let store = memory_store().await;
        let moderator = Moderator::from_config(&cfg, store.clone()).await.unwrap();
        assert_eq!(moderator.chain().validator_names(), vec!["blacklist", "link_limit"]);
        assert_eq!(store.all_phrases().await.unwrap(), vec!["cheap pills"]);

        let decision = moderator
            .moderate(
                &Comment::with_text("Cheap Pills at http://x"),
                &RequestContext::default(),
            )
            .await;
        assert_eq!(decision.verdict, Verdict::Reject);
        assert_eq!(decision.scores, vec![("blacklist", Score::SPAM)]);
    });
}

#[test]
fn from_config_missing_key() {
    let cfg = Config {
        validators: Some(vec![ValidatorConfig::named("typepad")]),
        ..Config::default()
    };
    tokio_test::block_on(async {
        let store = memory_store().await;
        assert!(Moderator::from_config(&cfg, store).await.is_err());
    });
}

#[tokio::test]
async fn mapped_ipv6_shares_history_with_ipv4() {
    let store = memory_store().await;
    let chain = ValidatorChain::new()
        .add_validator(Box::new(BannedIpValidator::default()))
        .add_validator(Box::new(LinkLimitValidator::default()));
    let moderator =
        Moderator::new(chain, Aggregator::default(), store.clone()).with_history(true);
    let request = RequestContext::default();

    let held = moderator
        .moderate(&from("::ffff:192.0.2.8", "http://a.example http://b.example"), &request)
        .await;
    assert_eq!(held.verdict, Verdict::Hold);
    assert_eq!(store.count_held("192.0.2.8").await.unwrap(), 1);

    let again = moderator.moderate(&from("192.0.2.8", "plain words"), &request).await;
    assert_eq!(again.scores, vec![("ip", Score::new(0.1))]);
    let mapped = moderator.moderate(&from("::ffff:192.0.2.8", "plain words"), &request).await;
    assert_eq!(mapped.scores, vec![("ip", Score::new(0.1))]);
}
