//! Header resolution and row-to-record conversion.

use super::fields::{clean_text, parse_date, parse_decimal, split_row};
use crate::classify;
use crate::types::{RateRecord, Taxonomy};

/// Columns read from a rate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Code,
    Exception,
    Type,
    Description,
    FederalDomestic,
    FederalImport,
    State,
    Municipal,
    ValidFrom,
    ValidTo,
    Source,
}

impl Column {
    pub const ALL: [Column; 11] = [
        Column::Code,
        Column::Exception,
        Column::Type,
        Column::Description,
        Column::FederalDomestic,
        Column::FederalImport,
        Column::State,
        Column::Municipal,
        Column::ValidFrom,
        Column::ValidTo,
        Column::Source,
    ];

    /// Header name as published in the tables.
    #[must_use]
    pub fn header(&self) -> &'static str {
        match self {
            Self::Code => "codigo",
            Self::Exception => "ex",
            Self::Type => "tipo",
            Self::Description => "descricao",
            Self::FederalDomestic => "nacionalfederal",
            Self::FederalImport => "importadosfederal",
            Self::State => "estadual",
            Self::Municipal => "municipal",
            Self::ValidFrom => "vigenciainicio",
            Self::ValidTo => "vigenciafim",
            Self::Source => "fonte",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Column positions resolved once from the header line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    indices: [Option<usize>; 11],
}

impl ColumnMap {
    /// Resolve column positions from a header line (case-insensitive, first match wins).
    pub fn from_header(header: &str) -> Self {
        // A UTF-8 BOM decoded as Latin-1 shows up as "ï»¿".
        let header = header
            .trim_start_matches('\u{feff}')
            .trim_start_matches("\u{ef}\u{bb}\u{bf}");
        let names = split_row(header);

        let mut map = Self::default();
        for column in Column::ALL {
            map.indices[column.slot()] = names
                .iter()
                .position(|name| name.trim().eq_ignore_ascii_case(column.header()));
        }
        map
    }

    /// Position of a column, if the header has it.
    pub fn index(&self, column: Column) -> Option<usize> {
        self.indices[column.slot()]
    }

    /// Cell value for a column; missing columns and short rows read as `""`.
    pub fn get<'a>(&self, cells: &[&'a str], column: Column) -> &'a str {
        self.index(column)
            .and_then(|i| cells.get(i).copied())
            .unwrap_or("")
    }
}

/// A validated row together with its resolved taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub taxonomy: Taxonomy,
    pub record: RateRecord,
}

/// Parse one data row.
///
/// Returns `None` when the code is blank or any of the four rates or the
/// start of validity cannot be parsed.
pub fn parse_row(columns: &ColumnMap, line: &str) -> Option<ParsedRow> {
    let cells = split_row(line);
    let cell = |column: Column| columns.get(&cells, column);

    let code = cell(Column::Code).trim();
    if code.is_empty() {
        return None;
    }
    let taxonomy = classify::resolve(cell(Column::Type), code);

    let record = RateRecord {
        code: code.to_string(),
        fiscal_exception: clean_text(cell(Column::Exception)),
        description: clean_text(cell(Column::Description)),
        federal_domestic: parse_decimal(cell(Column::FederalDomestic))?,
        federal_import: parse_decimal(cell(Column::FederalImport))?,
        state: parse_decimal(cell(Column::State))?,
        municipal: parse_decimal(cell(Column::Municipal))?,
        valid_from: parse_date(cell(Column::ValidFrom))?,
        valid_to: parse_date(cell(Column::ValidTo)),
        source: clean_text(cell(Column::Source)),
    };

    Some(ParsedRow { taxonomy, record })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const HEADER: &str = "codigo;ex;tipo;descricao;nacionalfederal;importadosfederal;estadual;municipal;vigenciainicio;vigenciafim;chave;versao;fonte";

    fn columns() -> ColumnMap {
        ColumnMap::from_header(HEADER)
    }

    #[test]
    fn test_column_map_resolves_all_columns() {
        let map = columns();
        assert_eq!(map.index(Column::Code), Some(0));
        assert_eq!(map.index(Column::Municipal), Some(7));
        assert_eq!(map.index(Column::Source), Some(12));
    }

    #[test]
    fn test_column_map_case_insensitive_and_bom() {
        let map = ColumnMap::from_header("\u{ef}\u{bb}\u{bf}CODIGO; Ex ;Tipo");
        assert_eq!(map.index(Column::Code), Some(0));
        assert_eq!(map.index(Column::Exception), Some(1));
        assert_eq!(map.index(Column::Type), Some(2));
        assert_eq!(map.index(Column::Source), None);
    }

    #[test]
    fn test_column_map_missing_column_reads_empty() {
        let map = ColumnMap::from_header("codigo");
        assert_eq!(map.get(&["85171231", "x"], Column::Description), "");
        let map = columns();
        assert_eq!(map.get(&["85171231"], Column::Source), "");
    }

    #[test]
    fn test_parse_row_full() {
        let line = "85171231;01;0;\"Telefones celulares\";13,45;15,45;18,00;0,00;01/03/2024;30/06/2024;ABC123;24.1.A;IBPT/empresometro.com.br";
        let row = parse_row(&columns(), line).unwrap();

        assert_eq!(row.taxonomy, Taxonomy::Ncm);
        assert_eq!(row.record.code, "85171231");
        assert_eq!(row.record.fiscal_exception.as_deref(), Some("01"));
        assert_eq!(
            row.record.description.as_deref(),
            Some("Telefones celulares")
        );
        assert_eq!(row.record.federal_domestic, Decimal::from_str("13.45").unwrap());
        assert_eq!(row.record.state, Decimal::from_str("18").unwrap());
        assert_eq!(row.record.valid_from, "2024-03-01");
        assert_eq!(row.record.valid_to.as_deref(), Some("2024-06-30"));
        assert_eq!(
            row.record.source.as_deref(),
            Some("IBPT/empresometro.com.br")
        );
    }

    #[test]
    fn test_parse_row_explicit_type_wins() {
        let line = "0101;;LC116;Servicos;1;2;3;4;2024-01-01;;;;";
        let row = parse_row(&columns(), line).unwrap();
        assert_eq!(row.taxonomy, Taxonomy::Lc116);
        assert_eq!(row.record.fiscal_exception, None);
        assert_eq!(row.record.valid_to, None);
        assert_eq!(row.record.source, None);
    }

    #[test]
    fn test_parse_row_other_taxonomy_is_reported() {
        let line = "AB12;;;x;1;2;3;4;2024-01-01;;;;";
        let row = parse_row(&columns(), line).unwrap();
        assert_eq!(row.taxonomy, Taxonomy::Other);
    }

    #[test]
    fn test_parse_row_rejects_blank_code() {
        assert!(parse_row(&columns(), "  ;;;x;1;2;3;4;2024-01-01;;;;").is_none());
    }

    #[test]
    fn test_parse_row_rejects_missing_rate() {
        assert!(parse_row(&columns(), "85171231;;;x;1;;3;4;2024-01-01;;;;").is_none());
        assert!(parse_row(&columns(), "85171231;;;x;1;2;3;abc;2024-01-01;;;;").is_none());
    }

    #[test]
    fn test_parse_row_rejects_missing_valid_from() {
        assert!(parse_row(&columns(), "85171231;;;x;1;2;3;4;;;;;").is_none());
        assert!(parse_row(&columns(), "85171231;;;x;1;2;3;4;ontem;;;;").is_none());
    }

    #[test]
    fn test_parse_row_short_line() {
        assert!(parse_row(&columns(), "85171231").is_none());
    }
}
