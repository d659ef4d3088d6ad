//! Leitura de arquivos de chaves de busca e gravação de resultados.
//!
//! O formato de entrada é escolhido pela extensão: `.csv` com cabeçalho
//! `first_name,last_name,location`, ou `.json` contendo um array de objetos
//! de chave. Campos em branco significam "não buscar por este campo".
//! A saída é sempre um array JSON formatado de registros.

use std::fs;
use std::path::Path;

use crate::error::DevscoutError;
use crate::github::{SearchKey, UserRecord};

/// Lê chaves de busca de um arquivo `.csv` ou `.json`.
pub fn read_search_keys(path: &Path) -> Result<Vec<SearchKey>, DevscoutError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match extension.as_str() {
        "csv" => read_csv(path),
        "json" => read_json(path),
        _ => Err(DevscoutError::BadInputFile(format!(
            "{}: expected a .csv or .json file",
            path.display()
        ))),
    }
}

fn read_csv(path: &Path) -> Result<Vec<SearchKey>, DevscoutError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut keys = Vec::new();
    for row in reader.deserialize() {
        let key: SearchKey = row?;
        keys.push(key);
    }
    Ok(keys)
}

fn read_json(path: &Path) -> Result<Vec<SearchKey>, DevscoutError> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Grava os registros como um array JSON formatado.
pub fn write_records(records: &[UserRecord], path: &Path) -> Result<(), DevscoutError> {
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json)?;
    Ok(())
}
