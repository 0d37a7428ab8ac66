pub mod table_id;
