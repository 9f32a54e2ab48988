use std::str::FromStr;

/// Coarse business category of a router call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Swap,
    AddLiquidity,
    RemoveLiquidity,
    Unclassified,
}

impl Category {
    pub const CLASSIFIED: [Category; 3] = [
        Category::Swap,
        Category::AddLiquidity,
        Category::RemoveLiquidity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Swap => "swap",
            Category::AddLiquidity => "addLiquidity",
            Category::RemoveLiquidity => "removeLiquidity",
            Category::Unclassified => "unclassified",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "swap" => Ok(Category::Swap),
            "addLiquidity" => Ok(Category::AddLiquidity),
            "removeLiquidity" => Ok(Category::RemoveLiquidity),
            "unclassified" => Ok(Category::Unclassified),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

/// Map a router method name to its category. Total: anything that is not a
/// known liquidity or swap entry point is `Unclassified`.
pub fn classify(method_name: &str) -> Category {
    match method_name {
        "addLiquidity" | "addLiquidityETH" => Category::AddLiquidity,
        "removeLiquidity" | "removeLiquidityETH" => Category::RemoveLiquidity,
        "swapExactTokensForTokens"
        | "swapTokensForExactTokens"
        | "swapExactETHForTokens"
        | "swapTokensForExactETH"
        | "swapExactTokensForETH"
        | "swapETHForExactTokens" => Category::Swap,
        _ => Category::Unclassified,
    }
}

/// Which slice of the run ends up in the report: everything, or a single
/// category bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSelection {
    All,
    Only(Category),
}

impl ReportSelection {
    pub fn label(&self) -> &'static str {
        match self {
            ReportSelection::All => "all",
            ReportSelection::Only(category) => category.as_str(),
        }
    }
}

impl FromStr for ReportSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(ReportSelection::All);
        }
        match s.parse::<Category>()? {
            Category::Unclassified => Err("'unclassified' is not a report type".to_string()),
            category => Ok(ReportSelection::Only(category)),
        }
    }
}
