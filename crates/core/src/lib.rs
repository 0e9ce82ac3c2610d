pub mod category;
pub mod money;
pub mod number;
pub mod transaction;

pub use category::{ExpenseTypeId, IncomeTypeId, ParseTransactionTypeError, PropertyId, TransactionType};
pub use money::Money;
pub use number::{parse_finnish_number, try_parse_finnish_number};
pub use transaction::BankTransaction;
