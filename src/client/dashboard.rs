use super::api::ApiClient;
use super::error::ClientResult;
use super::format::{format_brl, format_date};
use super::lifecycle::Mount;
use super::ui::Tone;
use crate::models::{CategoryStat, ListTransactionsQuery, MonthlyStat, Summary, Transaction};
use crate::utils::round_money;

pub const PALETTE: [&str; 8] = [
    "#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899", "#14b8a6", "#f97316",
];
pub const RECENT_LIMIT: u32 = 5;
pub const TREND_MONTHS: u32 = 6;

/// One independently loaded part of the overview. A failed read only
/// affects its own section.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Section<T> {
    fn from_result(result: ClientResult<T>, what: &str) -> Self {
        match result {
            Ok(value) => Section::Ready(value),
            Err(e) => {
                tracing::error!(error = %e, section = what, "dashboard read failed");
                Section::Failed(format!("Erro ao carregar {}", what))
            }
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Kpi {
    pub label: &'static str,
    pub value: String,
    pub tone: Tone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub name: String,
    pub value: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalancePoint {
    pub month: String,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentItem {
    pub date: String,
    pub description: String,
    pub amount: String,
    pub tone: Tone,
}

pub fn kpis(summary: &Summary) -> Vec<Kpi> {
    vec![
        Kpi {
            label: "Saldo Total",
            value: format_brl(summary.balance),
            tone: Tone::for_amount(summary.balance),
        },
        Kpi {
            label: "Receitas",
            value: format_brl(summary.total_income),
            tone: Tone::Positive,
        },
        Kpi {
            label: "Despesas",
            value: format_brl(summary.total_expenses),
            tone: Tone::Negative,
        },
        Kpi {
            label: "Transações",
            value: summary.total_transactions.to_string(),
            tone: Tone::Neutral,
        },
    ]
}

/// Categories without a colour take one from the palette by position.
pub fn pie_slices(stats: &[CategoryStat]) -> Vec<PieSlice> {
    stats
        .iter()
        .enumerate()
        .map(|(idx, stat)| PieSlice {
            name: stat.name.clone(),
            value: stat.value,
            color: stat
                .color
                .clone()
                .unwrap_or_else(|| PALETTE[idx % PALETTE.len()].to_string()),
        })
        .collect()
}

pub fn cumulative_balance(monthly: &[MonthlyStat]) -> Vec<BalancePoint> {
    monthly
        .iter()
        .scan(0.0, |running, stat| {
            *running += stat.balance;
            Some(BalancePoint {
                month: stat.month.clone(),
                balance: round_money(*running),
            })
        })
        .collect()
}

pub fn recent_items(transactions: &[Transaction]) -> Vec<RecentItem> {
    transactions
        .iter()
        .take(RECENT_LIMIT as usize)
        .map(|t| RecentItem {
            date: format_date(t.date),
            description: t.description.clone(),
            amount: format_brl(t.amount),
            tone: Tone::for_amount(t.amount),
        })
        .collect()
}

/// Read-only overview of the ledger.
pub struct Dashboard {
    api: ApiClient,
    mount: Mount,
    pub summary: Section<Summary>,
    pub recent: Section<Vec<Transaction>>,
    pub monthly: Section<Vec<MonthlyStat>>,
    pub by_category: Section<Vec<CategoryStat>>,
}

impl Dashboard {
    pub fn new(api: ApiClient) -> Self {
        Dashboard {
            api,
            mount: Mount::new(),
            summary: Section::Loading,
            recent: Section::Loading,
            monthly: Section::Loading,
            by_category: Section::Loading,
        }
    }

    pub fn unmount(&self) {
        self.mount.unmount();
    }

    /// Issues the four reads concurrently and fills each section on its own.
    pub async fn load(&mut self) {
        let recent_query = ListTransactionsQuery {
            limit: Some(RECENT_LIMIT),
            is_projection: Some(false),
            ..Default::default()
        };
        let api = &self.api;
        let reads = async {
            tokio::join!(
                api.summary(false),
                api.transactions(&recent_query),
                api.monthly_stats(TREND_MONTHS, false),
                api.stats_by_category(false),
            )
        };

        let Some((summary, recent, monthly, by_category)) = self.mount.token().guard(reads).await
        else {
            return;
        };
        self.summary = Section::from_result(summary, "resumo");
        self.recent = Section::from_result(recent.map(|page| page.transactions), "transações");
        self.monthly = Section::from_result(monthly, "dados mensais");
        self.by_category = Section::from_result(by_category, "categorias");
    }

    pub fn kpis(&self) -> Option<Vec<Kpi>> {
        self.summary.ready().map(kpis)
    }

    pub fn pie(&self) -> Option<Vec<PieSlice>> {
        self.by_category.ready().map(|stats| pie_slices(stats))
    }

    pub fn balance_trend(&self) -> Option<Vec<BalancePoint>> {
        self.monthly.ready().map(|monthly| cumulative_balance(monthly))
    }

    pub fn recent_items(&self) -> Option<Vec<RecentItem>> {
        self.recent.ready().map(|t| recent_items(t))
    }
}
