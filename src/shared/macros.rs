/***************************************/
/*               Macros                */
/***************************************/
#[macro_export]
macro_rules! unwrap_or_exit {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(e) => {
                log::error!("ERROR: {:#}", e);
                std::process::exit(1);
            }
        }
    };
    ($expr:expr, $msg:expr) => {
        match $expr {
            Ok(val) => val,
            Err(e) => {
                log::error!("ERROR: {}: {:#}", $msg, e);
                std::process::exit(1);
            }
        }
    };
}
