//! Common regex patterns for Brazilian sales-order extraction.
//!
//! Label patterns run against the normalized form of a line (lowercase,
//! diacritics folded, whitespace collapsed), so they are written in plain
//! lowercase ASCII. Numeric patterns are case-agnostic and also run against
//! the display text.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Candidate money run; only accepted when the whole run is pt-BR money (16.027,00)
    pub static ref NUMERIC_RUN: Regex = Regex::new(
        r"\d[\d.,]*"
    ).unwrap();

    pub static ref MONEY_STRICT: Regex = Regex::new(
        r"^\d{1,3}(?:\.\d{3})*,\d{2}$"
    ).unwrap();

    // Dates (dd/mm/yyyy, dd-mm-yy)
    pub static ref DATE_STRICT: Regex = Regex::new(
        r"^(\d{1,2})[/\-](\d{1,2})[/\-](\d{2,4})$"
    ).unwrap();

    pub static ref DATE_ANY: Regex = Regex::new(
        r"\b(\d{1,2})[/\-](\d{1,2})[/\-](\d{2,4})\b"
    ).unwrap();

    // Item table
    pub static ref TABLE_CODE_TOKEN: Regex = Regex::new(
        r"\b(?:cod|codigo|ref|referencia)\b"
    ).unwrap();

    pub static ref TABLE_DESCRIPTION_TOKEN: Regex = Regex::new(
        r"\b(?:descricao|descr|desc|discriminacao)\b"
    ).unwrap();

    pub static ref TABLE_COLUMN_HINT: Regex = Regex::new(
        r"\b(?:quant\w*|qtde?|valor(?:es)?)\b"
    ).unwrap();

    pub static ref PAYMENT_FOOTER: Regex = Regex::new(
        r"\b(?:condic(?:oes|ao)\s+de\s+pagamento|cond\.?\s*(?:de\s+)?pagto|forma\s+de\s+pagamento)\b"
    ).unwrap();

    pub static ref ROW_CODE: Regex = Regex::new(
        r"^([A-Za-z0-9]{2,10})(?:\s+|$)"
    ).unwrap();

    pub static ref ROW_TRAILING_MONEY: Regex = Regex::new(
        r"(?:^|\s)(\d{1,3}(?:\.\d{3})*,\d{2})\s*$"
    ).unwrap();

    pub static ref ROW_TRAILING_QTY: Regex = Regex::new(
        r"(?:^|\s)(\d{1,5})\s*$"
    ).unwrap();

    // Combined lines (two labels sharing one line)
    pub static ref NAME_AND_CUSTOMER_CODE: Regex = Regex::new(
        r"^(?:nome(?:\s+do\s+cliente)?|cliente|razao\s+social)\b\s*[:\-]?\s*(.+?)\s+cod(?:igo)?\.?\s*(?:do\s+)?cliente\b\s*[:\-]?\s*([a-z0-9][a-z0-9\-/.]*)"
    ).unwrap();

    pub static ref PLACE_AND_DATE: Regex = Regex::new(
        r"^local\b\s*[:\-]?\s*(.+?)\s+data\b\s*[:\-]?\s*(\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4})\b"
    ).unwrap();

    pub static ref CITY_AND_STATE: Regex = Regex::new(
        r"^(?:cidade|municipio)\b\s*[:\-]?\s*(.+?)\s+(?:uf|estado)\b\s*[:\-]?\s*([a-z]{2})\b"
    ).unwrap();

    // Single labels
    pub static ref NAME_LABEL: Regex = Regex::new(
        r"^(?:nome(?:\s+do\s+cliente)?|cliente|razao\s+social)\b\s*[:\-]?\s*(.+)$"
    ).unwrap();

    pub static ref CUSTOMER_CODE_LABEL: Regex = Regex::new(
        r"\bcod(?:igo)?\.?\s*(?:do\s+)?cliente\b\s*[:\-]?\s*([a-z0-9][a-z0-9\-/.]*)"
    ).unwrap();

    pub static ref CUSTOMER_CODE_TAIL: Regex = Regex::new(
        r"\s+cod(?:igo)?\.?\s*(?:do\s+)?cliente\b.*$"
    ).unwrap();

    pub static ref SUPPLIER_LABEL: Regex = Regex::new(
        r"^(?:fornecedor|representada|fabricante)\b\s*[:\-]?\s*(.+)$"
    ).unwrap();

    pub static ref SALESPERSON_LABEL: Regex = Regex::new(
        r"^(?:vendedor|representante)\b\s*[:\-]?\s*(.+)$"
    ).unwrap();

    pub static ref ORDER_NUMBER_LABEL: Regex = Regex::new(
        r"(?:^pedido\b\s*(?:n(?:o|umero)\b\.?|#)?|\bpedido\s*(?:n(?:o|umero)\b\.?|#|:)|^n(?:o|umero)?\b\.?\s*(?:do\s+)?pedido\b|\bn(?:o|umero)\b\.?\s*do\s+pedido\b)\s*[:\-]?\s*([a-z0-9\-/]*\d[a-z0-9\-/]*)(?:\s|$)"
    ).unwrap();

    pub static ref ORDER_DATE_LABEL: Regex = Regex::new(
        r"^data(?:\s+(?:do\s+pedido|da\s+emissao|de\s+emissao))?\s*[:\-]?\s*(\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4})\b"
    ).unwrap();

    pub static ref DELIVERY_DATE_LABEL: Regex = Regex::new(
        r"(?:\b(?:data\s+(?:de\s+|da\s+)?entrega|previsao\s+(?:de\s+)?entrega)\b|^entrega\b|\bentrega\s*:)\s*[:\-]?\s*(.+)$"
    ).unwrap();

    pub static ref PLACE_LABEL: Regex = Regex::new(
        r"^local\b\s*[:\-]?\s*(.+)$"
    ).unwrap();

    pub static ref ADDRESS_LABEL: Regex = Regex::new(
        r"^(?:endereco|end)\b\.?\s*[:\-]?\s*(.+)$"
    ).unwrap();

    pub static ref DISTRICT_LABEL: Regex = Regex::new(
        r"^bairro\b\s*[:\-]?\s*(.+)$"
    ).unwrap();

    pub static ref CITY_LABEL: Regex = Regex::new(
        r"^(?:cidade|municipio)\b\s*[:\-]?\s*(.+)$"
    ).unwrap();

    pub static ref STATE_LABEL: Regex = Regex::new(
        r"(?:^(?:uf|estado)\b|\b(?:uf|estado)\s*:)\s*[:\-]?\s*([a-z]{2})\b"
    ).unwrap();

    pub static ref CEP_LABEL: Regex = Regex::new(
        r"\bcep\b\s*[:\-]?\s*(\d{2}\.?\d{3}\s*-?\s*\d{3})\b"
    ).unwrap();

    pub static ref TAX_ID_LABEL: Regex = Regex::new(
        r"\b(?:cpf|cnpj)(?:\s*/\s*(?:cpf|cnpj))?\b\s*[:\-.]?\s*(\d[\d.\-/\s]*\d)"
    ).unwrap();

    pub static ref STATE_REGISTRATION_LABEL: Regex = Regex::new(
        r"\b(?:inscricao\s+estadual|insc\.?\s*est\.?|i\.e\.?)\s*[:\-]?\s*(isento|[\d.\-/]*\d[\d.\-/]*)"
    ).unwrap();

    pub static ref PHONE_LABEL: Regex = Regex::new(
        r"\b(?:telefone|fone)\b\.?\s*[:\-]?\s*(.+)$"
    ).unwrap();

    pub static ref EMAIL_LABEL: Regex = Regex::new(
        r"\be-?mail\b\s*[:\-]?\s*(.+)$"
    ).unwrap();

    pub static ref PAYMENT_TERMS_LABEL: Regex = Regex::new(
        r"\b(?:condic(?:oes|ao)\s+de\s+pagamento|cond\.?\s*(?:de\s+)?pagto|forma\s+de\s+pagamento)\b\.?\s*[:\-]?\s*(.*)$"
    ).unwrap();

    pub static ref SIGNATURE_LABEL: Regex = Regex::new(
        r"^assinatura\b(?:\s+(?:do|da)\s+(?:cliente|comprador|responsavel))?\s*[:\-]?\s*(.*)$"
    ).unwrap();

    // Post-processing
    pub static ref TRAILING_DATE_LABEL: Regex = Regex::new(
        r"\s+data\b.*$"
    ).unwrap();

    pub static ref TRAILING_LOCALITY_LABEL: Regex = Regex::new(
        r"\s+(?:bairro|cidade|municipio|cep|uf|estado)\b.*$"
    ).unwrap();

    pub static ref TRAILING_STATE_LABEL: Regex = Regex::new(
        r"\s+(?:uf|estado|cep)\b.*$"
    ).unwrap();

    pub static ref PHONE_SHAPE: Regex = Regex::new(
        r"\(?\b\d{2}\)?\s*9?\d{4}[\s\-.]?\d{4}\b"
    ).unwrap();

    pub static ref EMAIL: Regex = Regex::new(
        r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"
    ).unwrap();

    pub static ref LABELED_LINE: Regex = Regex::new(
        r"^[a-z][a-z ./]{1,30}:"
    ).unwrap();
}
