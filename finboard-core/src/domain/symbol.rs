//! Static reference data: the symbol table grouped by sector.
//!
//! Loaded once at startup (built-in default or a TOML file) and never
//! mutated during a session.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A tradable instrument in the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    #[serde(default)]
    pub tracked: bool,
}

impl SymbolInfo {
    pub fn new(ticker: &str, name: &str, sector: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            name: name.to_string(),
            sector: sector.to_string(),
            tracked: false,
        }
    }

    /// "Name (TICKER)" as shown in selection lists.
    pub fn display(&self) -> String {
        format!("{} ({})", self.name, self.ticker)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ReferenceFile {
    symbols: Vec<SymbolInfo>,
}

/// Immutable symbol table.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    symbols: Vec<SymbolInfo>,
}

impl ReferenceTable {
    pub fn new(symbols: Vec<SymbolInfo>) -> Self {
        Self { symbols }
    }

    /// Load a reference table from a TOML file with a `[[symbols]]` array.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read symbol table: {e}"))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        let file: ReferenceFile =
            toml::from_str(content).map_err(|e| format!("parse symbol table TOML: {e}"))?;
        Ok(Self::new(file.symbols))
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(&ReferenceFile {
            symbols: self.symbols.clone(),
        })
        .map_err(|e| format!("serialize symbol table: {e}"))
    }

    pub fn symbols(&self) -> &[SymbolInfo] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Case-insensitive ticker lookup.
    pub fn by_ticker(&self, ticker: &str) -> Option<&SymbolInfo> {
        self.symbols
            .iter()
            .find(|s| s.ticker.eq_ignore_ascii_case(ticker))
    }

    /// Case-insensitive display-name lookup.
    pub fn by_name(&self, name: &str) -> Option<&SymbolInfo> {
        self.symbols
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Resolve either a ticker or a company name.
    pub fn resolve(&self, key: &str) -> Option<&SymbolInfo> {
        self.by_ticker(key).or_else(|| self.by_name(key))
    }

    /// Sector names in sorted order.
    pub fn sectors(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.iter().map(|s| s.sector.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn sector_members(&self, sector: &str) -> Vec<&SymbolInfo> {
        self.symbols
            .iter()
            .filter(|s| s.sector.eq_ignore_ascii_case(sector))
            .collect()
    }

    /// Symbols grouped by sector.
    pub fn by_sector(&self) -> BTreeMap<&str, Vec<&SymbolInfo>> {
        let mut map: BTreeMap<&str, Vec<&SymbolInfo>> = BTreeMap::new();
        for s in &self.symbols {
            map.entry(s.sector.as_str()).or_default().push(s);
        }
        map
    }

    pub fn tracked(&self) -> Vec<&SymbolInfo> {
        self.symbols.iter().filter(|s| s.tracked).collect()
    }

    /// Built-in table of TSX-listed companies.
    pub fn default_canada() -> Self {
        const ROWS: &[(&str, &str, &str)] = &[
            ("SAP.TO", "Saputo", "Agri-Food"),
            ("ATD.TO", "Alimentation Couche-Tard", "Agri-Food"),
            ("L.TO", "Loblaw", "Agri-Food"),
            ("MFI.TO", "Maple Leaf Foods", "Agri-Food"),
            ("EMP-A.TO", "Empire Company", "Agri-Food"),
            ("PBH.TO", "Premium Brands", "Agri-Food"),
            ("NWC.TO", "North West Company", "Agri-Food"),
            ("CNR.TO", "Canadian National Railway", "Transportation"),
            ("CP.TO", "Canadian Pacific Kansas City", "Transportation"),
            ("TFII.TO", "TFI International", "Transportation"),
            ("WTE.TO", "Westshore Terminals", "Transportation"),
            ("CAE.TO", "CAE Inc.", "Transportation"),
            ("AC.TO", "Air Canada", "Transportation"),
            ("SU.TO", "Suncor Energy", "Energy"),
            ("ENB.TO", "Enbridge", "Energy"),
            ("TRP.TO", "TC Energy", "Energy"),
            ("CVE.TO", "Cenovus Energy", "Energy"),
            ("CNQ.TO", "Canadian Natural Resources", "Energy"),
            ("PPL.TO", "Pembina Pipeline", "Energy"),
            ("GEI.TO", "Gibson Energy", "Energy"),
            ("ALA.TO", "AltaGas", "Energy"),
            ("FTS.TO", "Fortis", "Utilities"),
            ("H.TO", "Hydro One", "Utilities"),
            ("CGO.TO", "Cogeco", "Telecommunications"),
            ("QBR-B.TO", "Quebecor", "Telecommunications"),
            ("RCI-B.TO", "Rogers", "Telecommunications"),
            ("T.TO", "Telus", "Telecommunications"),
            ("BCE.TO", "BCE Inc.", "Telecommunications"),
            ("SHOP.TO", "Shopify", "Technology"),
            ("CSU.TO", "Constellation Software", "Technology"),
            ("BB.TO", "BlackBerry", "Technology"),
            ("LSPD.TO", "Lightspeed", "Technology"),
            ("DND.TO", "Dye & Durham", "Technology"),
            ("KXS.TO", "Kinaxis", "Technology"),
            ("ENGH.TO", "Enghouse Systems", "Technology"),
            ("GIB-A.TO", "CGI Inc.", "Technology"),
            ("RY.TO", "Royal Bank of Canada", "Financials"),
            ("TD.TO", "Toronto-Dominion Bank", "Financials"),
            ("BMO.TO", "Bank of Montreal", "Financials"),
            ("BNS.TO", "Scotiabank", "Financials"),
            ("CM.TO", "Canadian Imperial Bank of Commerce", "Financials"),
            ("NA.TO", "National Bank of Canada", "Financials"),
            ("MFC.TO", "Manulife Financial", "Financials"),
            ("POW.TO", "Power Corporation of Canada", "Financials"),
            ("ABX.TO", "Barrick Gold", "Mining"),
            ("CCO.TO", "Cameco", "Mining"),
            ("K.TO", "Kinross Gold", "Mining"),
            ("NTR.TO", "Nutrien", "Mining"),
        ];
        Self::new(
            ROWS.iter()
                .map(|(ticker, name, sector)| SymbolInfo::new(ticker, name, sector))
                .collect(),
        )
    }
}
