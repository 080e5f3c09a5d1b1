//! The achievement catalog: static definitions and their condition tags.
//!
//! The catalog is plain data. The evaluator never reaches for a global: it
//! takes the catalog as an explicit argument, so tests and future product
//! variants can inject their own.

use crate::database_id::AchievementId;

/// The symbolic condition evaluated to decide whether an achievement is
/// earned.
///
/// Every achievement in the catalog names exactly one condition. Most are
/// pure predicates over the user's data (see the `holds` method); a couple
/// describe UI interactions the data model cannot observe and only unlock
/// through [crate::achievement::unlock_for_condition].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// The user categorized their first transaction.
    FirstCategorization,
    /// The user created their first custom category.
    FirstCategoryCreated,
    /// The user defined their first monthly budget.
    FirstBudgetCreated,
    /// More than 100 transactions have been categorized.
    Categorized100Transactions,
    /// Every imported transaction has a category.
    CategorizedFullStatement,
    /// Every budget of last month stayed within its limit.
    SpentUnderBudget,
    /// Every budget of last month stayed at or below 80% of its limit.
    Spent20PercentUnderBudget,
    /// Some category's spend fell at least 15% versus the prior month.
    ReducedCategorySpendingBy15Percent,
    /// The user inspected their top spending category (UI event).
    ViewedTopSpendingCategory,
    /// A month passed without spending in a superfluous category (UI event).
    NoSpendingInSuperfluousCategory,
    /// Net savings above R$ 500 in a single month.
    SavedMoreThan500,
    /// Net savings of at least R$ 100 in a single month.
    Saved100InMonth,
    /// Net savings of at least R$ 500 in a single month.
    Saved500InMonth,
    /// Net savings of at least R$ 1.000 in a single month.
    Saved1000InMonth,
    /// Net savings of at least 20% of a month's income.
    Saved20PercentOfIncome,
    /// A full day without recording any expense.
    NoSpendingFor24Hours,
    /// Within budget for 3 consecutive months.
    ConsistentSaver,
    /// One year since the earliest recorded transaction.
    OneYearAnniversary,
    /// Within budget for 12 consecutive months.
    LegendarySaver,
    /// Categorized an income transaction on a Friday.
    CategorizedIncomeOnFriday,
}

impl Condition {
    /// The camelCase wire form of the condition tag, e.g.
    /// `"firstBudgetCreated"`.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Condition::FirstCategorization => "firstCategorization",
            Condition::FirstCategoryCreated => "firstCategoryCreated",
            Condition::FirstBudgetCreated => "firstBudgetCreated",
            Condition::Categorized100Transactions => "categorized100Transactions",
            Condition::CategorizedFullStatement => "categorizedFullStatement",
            Condition::SpentUnderBudget => "spentUnderBudget",
            Condition::Spent20PercentUnderBudget => "spent20PercentUnderBudget",
            Condition::ReducedCategorySpendingBy15Percent => "reducedCategorySpendingBy15Percent",
            Condition::ViewedTopSpendingCategory => "viewedTopSpendingCategory",
            Condition::NoSpendingInSuperfluousCategory => "noSpendingInSuperfluousCategory",
            Condition::SavedMoreThan500 => "savedMoreThan500",
            Condition::Saved100InMonth => "saved100InMonth",
            Condition::Saved500InMonth => "saved500InMonth",
            Condition::Saved1000InMonth => "saved1000InMonth",
            Condition::Saved20PercentOfIncome => "saved20PercentOfIncome",
            Condition::NoSpendingFor24Hours => "noSpendingFor24Hours",
            Condition::ConsistentSaver => "consistentSaver",
            Condition::OneYearAnniversary => "oneYearAnniversary",
            Condition::LegendarySaver => "legendarySaver",
            Condition::CategorizedIncomeOnFriday => "categorizedIncomeOnFriday",
        }
    }

    /// Parse a wire-form condition tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        ALL_CONDITIONS
            .iter()
            .copied()
            .find(|condition| condition.as_tag() == tag)
    }
}

const ALL_CONDITIONS: &[Condition] = &[
    Condition::FirstCategorization,
    Condition::FirstCategoryCreated,
    Condition::FirstBudgetCreated,
    Condition::Categorized100Transactions,
    Condition::CategorizedFullStatement,
    Condition::SpentUnderBudget,
    Condition::Spent20PercentUnderBudget,
    Condition::ReducedCategorySpendingBy15Percent,
    Condition::ViewedTopSpendingCategory,
    Condition::NoSpendingInSuperfluousCategory,
    Condition::SavedMoreThan500,
    Condition::Saved100InMonth,
    Condition::Saved500InMonth,
    Condition::Saved1000InMonth,
    Condition::Saved20PercentOfIncome,
    Condition::NoSpendingFor24Hours,
    Condition::ConsistentSaver,
    Condition::OneYearAnniversary,
    Condition::LegendarySaver,
    Condition::CategorizedIncomeOnFriday,
];

/// One entry of the achievement catalog.
///
/// Titles and descriptions are product copy shown to the user; the icon is
/// an opaque symbolic name resolved by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AchievementDefinition {
    /// Stable catalog ID, referenced by unlock records.
    pub id: AchievementId,
    /// The condition that earns this achievement.
    pub condition: Condition,
    /// Display title.
    pub title: &'static str,
    /// Display description.
    pub description: &'static str,
    /// Symbolic icon name, e.g. "piggy-bank".
    pub icon: &'static str,
}

/// The standard FinSight achievement catalog.
pub fn default_catalog() -> &'static [AchievementDefinition] {
    DEFAULT_CATALOG
}

const DEFAULT_CATALOG: &[AchievementDefinition] = &[
    // Organização e engajamento
    AchievementDefinition {
        id: "ach_1",
        condition: Condition::FirstCategorization,
        title: "Primeira Conquista",
        description: "Você categorizou sua primeira transação. O primeiro passo para a organização!",
        icon: "award",
    },
    AchievementDefinition {
        id: "ach_5",
        condition: Condition::FirstCategoryCreated,
        title: "Dando Nome aos Bois",
        description: "Você criou sua primeira categoria personalizada. Agora o controle é todo seu!",
        icon: "tags",
    },
    AchievementDefinition {
        id: "ach_8",
        condition: Condition::FirstBudgetCreated,
        title: "Planejador",
        description: "Você definiu seu primeiro orçamento mensal. O planejamento é a chave do sucesso.",
        icon: "calendar-check",
    },
    AchievementDefinition {
        id: "ach_6",
        condition: Condition::Categorized100Transactions,
        title: "Mestre da Organização",
        description: "Uau! Você já categorizou mais de 100 transações. Sua vida financeira nunca esteve tão organizada.",
        icon: "shield-check",
    },
    AchievementDefinition {
        id: "ach_7",
        condition: Condition::CategorizedFullStatement,
        title: "Tudo em Seu Lugar",
        description: "Missão cumprida! Você categorizou todas as transações de um extrato completo.",
        icon: "file-check-2",
    },
    // Controle de gastos e orçamento
    AchievementDefinition {
        id: "ach_2",
        condition: Condition::SpentUnderBudget,
        title: "Economista Iniciante",
        description: "Você ficou dentro do orçamento em todas as categorias este mês. Ótimo controle!",
        icon: "target",
    },
    AchievementDefinition {
        id: "ach_9",
        condition: Condition::Spent20PercentUnderBudget,
        title: "Mestre do Orçamento",
        description: "Você não apenas ficou dentro do orçamento, como também gastou 20% a menos do que o planejado.",
        icon: "flame",
    },
    AchievementDefinition {
        id: "ach_10",
        condition: Condition::ReducedCategorySpendingBy15Percent,
        title: "Operação Corta-Gasto",
        description: "Você conseguiu reduzir em 15% os gastos em uma categoria em relação ao mês anterior.",
        icon: "scissors",
    },
    AchievementDefinition {
        id: "ach_11",
        condition: Condition::ViewedTopSpendingCategory,
        title: "Onde o Dinheiro Mora?",
        description: "Você analisou seus gastos e identificou sua maior fonte de despesas do mês. Conhecimento é poder!",
        icon: "map-pin",
    },
    AchievementDefinition {
        id: "ach_12",
        condition: Condition::NoSpendingInSuperfluousCategory,
        title: "Mês Zen",
        description: "Você passou um mês inteiro sem gastar em uma categoria de \"supérfluos\". Mente sã, bolso são!",
        icon: "leaf",
    },
    // Poupança e metas
    AchievementDefinition {
        id: "ach_3",
        condition: Condition::SavedMoreThan500,
        title: "Poupador",
        description: "Você conseguiu economizar mais de R$ 500 em um único mês. Continue assim!",
        icon: "trending-up",
    },
    AchievementDefinition {
        id: "ach_13_bronze",
        condition: Condition::Saved100InMonth,
        title: "Ímã de Dinheiro (Bronze)",
        description: "Você economizou R$ 100 em um mês!",
        icon: "magnet",
    },
    AchievementDefinition {
        id: "ach_13_silver",
        condition: Condition::Saved500InMonth,
        title: "Ímã de Dinheiro (Prata)",
        description: "Você economizou R$ 500 em um mês!",
        icon: "magnet",
    },
    AchievementDefinition {
        id: "ach_13_gold",
        condition: Condition::Saved1000InMonth,
        title: "Ímã de Dinheiro (Ouro)",
        description: "Você economizou R$ 1.000 em um mês!",
        icon: "magnet",
    },
    AchievementDefinition {
        id: "ach_14",
        condition: Condition::Saved20PercentOfIncome,
        title: "Estrategista Financeiro",
        description: "Você conseguiu economizar mais de 20% da sua renda este mês. Um verdadeiro estrategista!",
        icon: "brain-circuit",
    },
    AchievementDefinition {
        id: "ach_15",
        condition: Condition::NoSpendingFor24Hours,
        title: "Dia do Cofre Cheio",
        description: "Você passou 24 horas sem registrar nenhum gasto. Pequenas vitórias levam a grandes resultados!",
        icon: "piggy-bank",
    },
    // Consistência e hábitos
    AchievementDefinition {
        id: "ach_4",
        condition: Condition::ConsistentSaver,
        title: "Constância é a Chave",
        description: "Você se manteve dentro do orçamento por 3 meses consecutivos. Hábito de mestre!",
        icon: "sparkles",
    },
    AchievementDefinition {
        id: "ach_16",
        condition: Condition::OneYearAnniversary,
        title: "Aniversário Financeiro",
        description: "Parabéns! Você está há 1 ano organizando suas finanças conosco.",
        icon: "calendar-heart",
    },
    AchievementDefinition {
        id: "ach_17",
        condition: Condition::LegendarySaver,
        title: "Lenda Financeira",
        description: "Você se manteve dentro do orçamento por 12 meses consecutivos. Você domina suas finanças!",
        icon: "crown",
    },
    AchievementDefinition {
        id: "ach_18",
        condition: Condition::CategorizedIncomeOnFriday,
        title: "Sextou!",
        description: "Você categorizou sua renda em uma sexta-feira. Começando o fim de semana com o pé direito!",
        icon: "coffee",
    },
];
