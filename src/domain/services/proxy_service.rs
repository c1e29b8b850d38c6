// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::account::Account;
use crate::domain::repositories::account_repository::AccountRepository;
use crate::domain::repositories::proxy_template_repository::ProxyTemplateRepository;
use crate::domain::repositories::task_repository::RepositoryError;
use futures::future::join_all;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// 分配结果汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionSummary {
    /// 实际写回代理的账号数
    pub assigned_count: usize,
    /// 候选账号总数
    pub total_candidates: usize,
}

/// 单次分配计划中的一条指派
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub account_id: Uuid,
    pub proxy_url: String,
}

/// 回收计划中的一次转移：捐赠者清空，饥饿账号接收
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassignment {
    pub donor_id: Uuid,
    pub starving_id: Uuid,
    pub proxy_url: String,
}

/// 计算分配计划
///
/// 纯内存算法，不触碰存储：
/// 1. 以候选集之外的占用数为基准计算每个去重代理URL的剩余容量；
/// 2. 候选按 active 优先分两组，各自洗牌后拼接；
/// 3. 依次为每个候选从仍有余量的URL中均匀随机挑选并扣减容量，
///    容量耗尽的URL移出可用列表；可用列表为空时剩余候选不分配。
///
/// `usage` 必须已排除候选集占用的槽位，候选即将被重新分配，
/// 它们持有的槽位视为已释放。
pub fn plan_distribution<R: Rng + ?Sized>(
    candidates: &[Account],
    proxy_urls: &[String],
    usage: &HashMap<String, u32>,
    max_accounts_per_proxy: u32,
    rng: &mut R,
) -> Vec<Assignment> {
    let mut availability: Vec<(String, u32)> = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    for url in proxy_urls {
        if seen.contains(&url.as_str()) {
            continue;
        }
        seen.push(url);
        let used = usage.get(url).copied().unwrap_or(0);
        if used < max_accounts_per_proxy {
            availability.push((url.clone(), max_accounts_per_proxy - used));
        }
    }

    let (mut active, mut rest): (Vec<&Account>, Vec<&Account>) =
        candidates.iter().partition(|a| a.status.is_active());
    active.shuffle(rng);
    rest.shuffle(rng);

    let mut assignments = Vec::new();
    for account in active.into_iter().chain(rest) {
        if availability.is_empty() {
            break;
        }
        let idx = rng.random_range(0..availability.len());
        let (url, remaining) = &mut availability[idx];
        assignments.push(Assignment {
            account_id: account.id,
            proxy_url: url.clone(),
        });
        *remaining -= 1;
        if *remaining == 0 {
            availability.swap_remove(idx);
        }
    }
    assignments
}

/// 计算回收计划
///
/// 为仍未拿到代理的 active 账号从非 active 的持有者手中转移代理。
/// 每个饥饿账号随机挑选一个捐赠者，捐赠者的代理被清空。
/// 转移不会增加在用代理总数，也不会让任何账号同时持有两个代理。
pub fn plan_reclaim<R: Rng + ?Sized>(
    starving: &[Uuid],
    donors: &[Account],
    rng: &mut R,
) -> Vec<Reassignment> {
    let mut pool: Vec<(Uuid, String)> = donors
        .iter()
        .filter(|d| !d.status.is_active())
        .filter_map(|d| d.proxy.clone().map(|p| (d.id, p)))
        .collect();

    let mut moves = Vec::new();
    for &starving_id in starving {
        if pool.is_empty() {
            break;
        }
        let idx = rng.random_range(0..pool.len());
        let (donor_id, proxy_url) = pool.swap_remove(idx);
        moves.push(Reassignment {
            donor_id,
            starving_id,
            proxy_url,
        });
    }
    moves
}

/// 代理分配器
///
/// 包装纯分配算法并负责仓库读写。所有读写严格限定在单一租户内。
pub struct ProxyAllocator {
    account_repo: Arc<dyn AccountRepository>,
    proxy_repo: Arc<dyn ProxyTemplateRepository>,
}

impl ProxyAllocator {
    /// 创建代理分配器
    pub fn new(
        account_repo: Arc<dyn AccountRepository>,
        proxy_repo: Arc<dyn ProxyTemplateRepository>,
    ) -> Self {
        Self {
            account_repo,
            proxy_repo,
        }
    }

    /// 对租户执行一次代理分配
    ///
    /// # 参数
    ///
    /// * `overwrite_existing` - 为true时已有代理的账号也参与重分配
    /// * `max_accounts_per_proxy` - 每个代理URL的账号容量
    pub async fn distribute(
        &self,
        tenant_id: Uuid,
        overwrite_existing: bool,
        max_accounts_per_proxy: u32,
    ) -> Result<DistributionSummary, RepositoryError> {
        let candidates = self
            .account_repo
            .find_distribution_candidates(tenant_id, !overwrite_existing)
            .await?;
        let templates = self.proxy_repo.list_by_tenant(tenant_id).await?;
        let proxy_urls: Vec<String> = templates.into_iter().map(|t| t.proxy_url).collect();

        let candidate_ids: Vec<Uuid> = candidates.iter().map(|a| a.id).collect();
        let usage = self
            .account_repo
            .proxy_usage_excluding(tenant_id, &candidate_ids)
            .await?;

        // ThreadRng is not Send, keep it out of await scopes.
        let assignments = {
            let mut rng = rand::rng();
            plan_distribution(
                &candidates,
                &proxy_urls,
                &usage,
                max_accounts_per_proxy,
                &mut rng,
            )
        };

        let assigned: Vec<Uuid> = assignments.iter().map(|a| a.account_id).collect();

        // Overwrite mode re-deals the whole candidate set: a candidate the
        // plan could not place ends up with no proxy, not its stale one.
        if overwrite_existing {
            let clears = candidates
                .iter()
                .filter(|a| a.proxy.is_some() && !assigned.contains(&a.id))
                .map(|a| self.account_repo.set_proxy(a.id, None));
            join_all(clears)
                .await
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;
        }

        let writes = assignments.iter().map(|assignment| {
            self.account_repo
                .set_proxy(assignment.account_id, Some(assignment.proxy_url.clone()))
        });
        join_all(writes)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        let starving: Vec<Uuid> = candidates
            .iter()
            .filter(|a| a.status.is_active() && !assigned.contains(&a.id))
            .map(|a| a.id)
            .collect();

        let mut reclaimed = 0;
        if !starving.is_empty() {
            let donors = self.account_repo.find_proxy_donors(tenant_id).await?;
            let moves = {
                let mut rng = rand::rng();
                plan_reclaim(&starving, &donors, &mut rng)
            };
            for m in &moves {
                self.account_repo.set_proxy(m.donor_id, None).await?;
                self.account_repo
                    .set_proxy(m.starving_id, Some(m.proxy_url.clone()))
                    .await?;
            }
            reclaimed = moves.len();
            if reclaimed > 0 {
                debug!(tenant_id = %tenant_id, reclaimed, "reclaimed proxies from non-active holders");
            }
        }

        let summary = DistributionSummary {
            assigned_count: assignments.len() + reclaimed,
            total_candidates: candidates.len(),
        };
        info!(
            tenant_id = %tenant_id,
            assigned = summary.assigned_count,
            candidates = summary.total_candidates,
            "proxy distribution finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::account::{AccountStatus, LoginMethod};
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn account(status: AccountStatus, proxy: Option<&str>) -> Account {
        Account {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            username: "u".to_string(),
            password_encrypted: None,
            seed_2fa: None,
            login_method: LoginMethod::Password,
            proxy: proxy.map(str::to_owned),
            fingerprint_id: None,
            session: None,
            status,
            last_error: None,
            is_checker: false,
            last_login: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn count_per_url(assignments: &[Assignment]) -> HashMap<String, u32> {
        let mut counts = HashMap::new();
        for a in assignments {
            *counts.entry(a.proxy_url.clone()).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let mut rng = StdRng::seed_from_u64(7);
        let candidates: Vec<Account> = (0..10)
            .map(|_| account(AccountStatus::Offline, None))
            .collect();
        let urls = vec!["p1".to_string(), "p2".to_string()];
        let assignments =
            plan_distribution(&candidates, &urls, &HashMap::new(), 3, &mut rng);

        assert_eq!(assignments.len(), 6);
        for (_, count) in count_per_url(&assignments) {
            assert!(count <= 3);
        }
    }

    #[test]
    fn test_existing_usage_reduces_capacity() {
        let mut rng = StdRng::seed_from_u64(1);
        let candidates: Vec<Account> = (0..5)
            .map(|_| account(AccountStatus::Offline, None))
            .collect();
        let urls = vec!["p1".to_string()];
        let mut usage = HashMap::new();
        usage.insert("p1".to_string(), 2);

        let assignments = plan_distribution(&candidates, &urls, &usage, 3, &mut rng);
        assert_eq!(assignments.len(), 1);
    }

    #[test]
    fn test_fully_used_proxy_is_unavailable() {
        let mut rng = StdRng::seed_from_u64(1);
        let candidates = vec![account(AccountStatus::Active, None)];
        let urls = vec!["p1".to_string()];
        let mut usage = HashMap::new();
        usage.insert("p1".to_string(), 3);

        let assignments = plan_distribution(&candidates, &urls, &usage, 3, &mut rng);
        assert!(assignments.is_empty());
    }

    #[test]
    fn test_duplicate_urls_count_once() {
        let mut rng = StdRng::seed_from_u64(3);
        let candidates: Vec<Account> = (0..4)
            .map(|_| account(AccountStatus::Offline, None))
            .collect();
        let urls = vec!["p1".to_string(), "p1".to_string()];

        let assignments = plan_distribution(&candidates, &urls, &HashMap::new(), 2, &mut rng);
        assert_eq!(assignments.len(), 2);
    }

    #[test]
    fn test_active_accounts_served_first_under_scarcity() {
        // Two active and one inactive account compete for P1(cap 2) and
        // P2(cap 1). Both active accounts must end up assigned on every
        // random ordering.
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let a = account(AccountStatus::Active, None);
            let b = account(AccountStatus::Active, None);
            let c = account(AccountStatus::Inactive, None);
            let candidates = vec![c.clone(), a.clone(), b.clone()];
            let urls = vec!["p1".to_string(), "p2".to_string()];
            let mut usage = HashMap::new();
            usage.insert("p2".to_string(), 2);

            let assignments =
                plan_distribution(&candidates, &urls, &usage, 3, &mut rng);

            let counts = count_per_url(&assignments);
            assert!(counts.get("p2").copied().unwrap_or(0) <= 1);
            let assigned: Vec<Uuid> = assignments.iter().map(|x| x.account_id).collect();
            assert!(assigned.contains(&a.id), "seed {}", seed);
            assert!(assigned.contains(&b.id), "seed {}", seed);
        }
    }

    #[test]
    fn test_candidates_beyond_capacity_left_unassigned() {
        let mut rng = StdRng::seed_from_u64(9);
        let candidates: Vec<Account> = (0..5)
            .map(|_| account(AccountStatus::Active, None))
            .collect();
        let urls = vec!["p1".to_string()];

        let assignments = plan_distribution(&candidates, &urls, &HashMap::new(), 2, &mut rng);
        assert_eq!(assignments.len(), 2);
    }

    #[test]
    fn test_reclaim_moves_from_non_active_donors() {
        let mut rng = StdRng::seed_from_u64(4);
        let starving = vec![Uuid::new_v4(), Uuid::new_v4()];
        let donors = vec![
            account(AccountStatus::Offline, Some("p1")),
            account(AccountStatus::Failed, Some("p2")),
        ];

        let moves = plan_reclaim(&starving, &donors, &mut rng);
        assert_eq!(moves.len(), 2);
        // Each donor surrenders exactly once and each starving account
        // receives exactly one proxy.
        let donor_ids: Vec<Uuid> = moves.iter().map(|m| m.donor_id).collect();
        assert_ne!(donor_ids[0], donor_ids[1]);
        let targets: Vec<Uuid> = moves.iter().map(|m| m.starving_id).collect();
        assert_ne!(targets[0], targets[1]);
    }

    #[test]
    fn test_reclaim_ignores_active_holders() {
        let mut rng = StdRng::seed_from_u64(5);
        let starving = vec![Uuid::new_v4()];
        let donors = vec![account(AccountStatus::Active, Some("p1"))];

        let moves = plan_reclaim(&starving, &donors, &mut rng);
        assert!(moves.is_empty());
    }

    #[test]
    fn test_reclaim_stops_when_donors_exhausted() {
        let mut rng = StdRng::seed_from_u64(6);
        let starving = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let donors = vec![account(AccountStatus::Offline, Some("p1"))];

        let moves = plan_reclaim(&starving, &donors, &mut rng);
        assert_eq!(moves.len(), 1);
    }

    #[test]
    fn test_reclaim_never_increases_proxies_in_use() {
        let mut rng = StdRng::seed_from_u64(8);
        let starving = vec![Uuid::new_v4(), Uuid::new_v4()];
        let donors = vec![
            account(AccountStatus::Offline, Some("p1")),
            account(AccountStatus::Challenge, Some("p2")),
            account(AccountStatus::Offline, None),
        ];
        let in_use_before = donors.iter().filter(|d| d.proxy.is_some()).count();

        let moves = plan_reclaim(&starving, &donors, &mut rng);
        // Every move clears one holder and fills one, net zero.
        assert!(moves.len() <= in_use_before);
    }

    struct InMemoryAccounts {
        accounts: std::sync::Mutex<Vec<Account>>,
    }

    #[async_trait::async_trait]
    impl AccountRepository for InMemoryAccounts {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, RepositoryError> {
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.id == id)
                .cloned())
        }

        async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Account>, RepositoryError> {
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| ids.contains(&a.id))
                .cloned()
                .collect())
        }

        async fn update(&self, account: &Account) -> Result<Account, RepositoryError> {
            let mut guard = self.accounts.lock().unwrap();
            if let Some(slot) = guard.iter_mut().find(|a| a.id == account.id) {
                *slot = account.clone();
            }
            Ok(account.clone())
        }

        async fn update_status(
            &self,
            id: Uuid,
            status: AccountStatus,
            last_error: Option<String>,
        ) -> Result<(), RepositoryError> {
            let mut guard = self.accounts.lock().unwrap();
            if let Some(a) = guard.iter_mut().find(|a| a.id == id) {
                a.status = status;
                a.last_error = last_error;
            }
            Ok(())
        }

        async fn persist_session(
            &self,
            id: Uuid,
            session: serde_json::Value,
            status: AccountStatus,
        ) -> Result<(), RepositoryError> {
            let mut guard = self.accounts.lock().unwrap();
            if let Some(a) = guard.iter_mut().find(|a| a.id == id) {
                a.session = Some(session);
                a.status = status;
            }
            Ok(())
        }

        async fn find_distribution_candidates(
            &self,
            tenant_id: Uuid,
            only_unassigned: bool,
        ) -> Result<Vec<Account>, RepositoryError> {
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.tenant_id == tenant_id)
                .filter(|a| !only_unassigned || a.proxy.is_none())
                .cloned()
                .collect())
        }

        async fn proxy_usage_excluding(
            &self,
            tenant_id: Uuid,
            excluded: &[Uuid],
        ) -> Result<HashMap<String, u32>, RepositoryError> {
            let mut usage = HashMap::new();
            for a in self.accounts.lock().unwrap().iter() {
                if a.tenant_id != tenant_id || excluded.contains(&a.id) {
                    continue;
                }
                if let Some(url) = &a.proxy {
                    *usage.entry(url.clone()).or_insert(0) += 1;
                }
            }
            Ok(usage)
        }

        async fn find_proxy_donors(
            &self,
            tenant_id: Uuid,
        ) -> Result<Vec<Account>, RepositoryError> {
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| {
                    a.tenant_id == tenant_id && a.proxy.is_some() && !a.status.is_active()
                })
                .cloned()
                .collect())
        }

        async fn set_proxy(&self, id: Uuid, proxy: Option<String>) -> Result<(), RepositoryError> {
            let mut guard = self.accounts.lock().unwrap();
            if let Some(a) = guard.iter_mut().find(|a| a.id == id) {
                a.proxy = proxy;
            }
            Ok(())
        }
    }

    struct StaticTemplates {
        urls: Vec<String>,
    }

    #[async_trait::async_trait]
    impl ProxyTemplateRepository for StaticTemplates {
        async fn list_by_tenant(
            &self,
            tenant_id: Uuid,
        ) -> Result<Vec<crate::domain::models::proxy::ProxyTemplate>, RepositoryError> {
            Ok(self
                .urls
                .iter()
                .enumerate()
                .map(|(i, url)| crate::domain::models::proxy::ProxyTemplate {
                    id: Uuid::new_v4(),
                    tenant_id,
                    name: format!("t{}", i),
                    proxy_url: url.clone(),
                    description: None,
                    created_at: Utc::now().into(),
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_overwrite_clears_holders_left_unplaced() {
        // Two offline accounts both hold p1 and only one slot exists. The
        // re-deal can place at most one of them; the other must come out
        // with no proxy so p1 never exceeds its capacity.
        let tenant_id = Uuid::new_v4();
        let mut a = account(AccountStatus::Offline, Some("p1"));
        let mut b = account(AccountStatus::Offline, Some("p1"));
        a.tenant_id = tenant_id;
        b.tenant_id = tenant_id;

        let accounts = Arc::new(InMemoryAccounts {
            accounts: std::sync::Mutex::new(vec![a, b]),
        });
        let templates = Arc::new(StaticTemplates {
            urls: vec!["p1".to_string()],
        });
        let allocator = ProxyAllocator::new(accounts.clone(), templates);

        let summary = allocator.distribute(tenant_id, true, 1).await.unwrap();
        assert_eq!(summary.assigned_count, 1);

        let snapshot = accounts.accounts.lock().unwrap();
        let holders = snapshot
            .iter()
            .filter(|x| x.proxy.as_deref() == Some("p1"))
            .count();
        assert_eq!(holders, 1);
        assert!(snapshot.iter().any(|x| x.proxy.is_none()));
    }
}
