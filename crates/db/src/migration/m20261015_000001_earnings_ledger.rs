//! Earnings ledger schema.
//!
//! Creates the enums, the balance table, the append-only transaction log,
//! commissions (unique per entity and order), withdrawal requests and
//! per-entity commission rate overrides.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: BALANCES
        // ============================================================
        db.execute_unprepared(BALANCES_SQL).await?;

        // ============================================================
        // PART 3: TRANSACTION LOG
        // ============================================================
        db.execute_unprepared(LEDGER_TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 4: COMMISSIONS & WITHDRAWALS
        // ============================================================
        db.execute_unprepared(COMMISSIONS_SQL).await?;
        db.execute_unprepared(WITHDRAWAL_REQUESTS_SQL).await?;
        db.execute_unprepared(COMMISSION_RATE_OVERRIDES_SQL).await?;

        // ============================================================
        // PART 5: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE entity_kind AS ENUM ('driver', 'restaurant');

CREATE TYPE transaction_type AS ENUM (
    'commission', 'manual_add', 'bonus', 'adjustment',
    'refund', 'deduction', 'withdrawal', 'payout'
);

CREATE TYPE commission_status AS ENUM ('approved');

CREATE TYPE withdrawal_status AS ENUM ('pending', 'approved', 'rejected', 'processed');

CREATE TYPE payment_method AS ENUM ('bank_transfer', 'wallet', 'cash');
";

const BALANCES_SQL: &str = r"
CREATE TABLE balances (
    entity_id UUID PRIMARY KEY,
    kind entity_kind NOT NULL,
    total_earnings NUMERIC(19, 2) NOT NULL DEFAULT 0,
    total_deductions NUMERIC(19, 2) NOT NULL DEFAULT 0,
    withdrawn_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    pending_withdrawal NUMERIC(19, 2) NOT NULL DEFAULT 0,
    available_balance NUMERIC(19, 2) NOT NULL DEFAULT 0,
    version BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_balances_non_negative CHECK (
        total_earnings >= 0 AND total_deductions >= 0 AND withdrawn_amount >= 0
        AND pending_withdrawal >= 0 AND available_balance >= 0
    ),
    CONSTRAINT chk_balances_identity CHECK (
        available_balance = total_earnings - total_deductions - withdrawn_amount - pending_withdrawal
    )
);
";

const LEDGER_TRANSACTIONS_SQL: &str = r"
CREATE TABLE ledger_transactions (
    id UUID PRIMARY KEY,
    entity_id UUID NOT NULL REFERENCES balances(entity_id),
    sequence BIGINT NOT NULL,
    transaction_type transaction_type NOT NULL,
    amount NUMERIC(19, 2) NOT NULL,
    description TEXT NOT NULL,
    reference_id VARCHAR(128),
    balance_after NUMERIC(19, 2) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_ledger_transactions_sequence UNIQUE (entity_id, sequence),
    CONSTRAINT chk_ledger_transactions_balance_after CHECK (balance_after >= 0)
);

CREATE INDEX idx_ledger_transactions_entity ON ledger_transactions(entity_id, sequence DESC);
CREATE INDEX idx_ledger_transactions_type ON ledger_transactions(entity_id, transaction_type, created_at DESC);
";

const COMMISSIONS_SQL: &str = r"
CREATE TABLE commissions (
    id UUID PRIMARY KEY,
    entity_id UUID NOT NULL REFERENCES balances(entity_id),
    order_id VARCHAR(128) NOT NULL,
    order_amount NUMERIC(19, 2) NOT NULL CHECK (order_amount >= 0),
    commission_rate NUMERIC(5, 2) NOT NULL CHECK (commission_rate BETWEEN 0 AND 100),
    commission_amount NUMERIC(19, 2) NOT NULL CHECK (commission_amount >= 0),
    credited_amount NUMERIC(19, 2) NOT NULL CHECK (credited_amount >= 0),
    status commission_status NOT NULL DEFAULT 'approved',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    -- At most one commission per delivered order
    CONSTRAINT uq_commissions_entity_order UNIQUE (entity_id, order_id)
);

CREATE INDEX idx_commissions_entity_created ON commissions(entity_id, created_at DESC);
";

const WITHDRAWAL_REQUESTS_SQL: &str = r"
CREATE TABLE withdrawal_requests (
    id UUID PRIMARY KEY,
    entity_id UUID NOT NULL REFERENCES balances(entity_id),
    entity_kind entity_kind NOT NULL,
    amount NUMERIC(19, 2) NOT NULL CHECK (amount > 0),
    payment_method payment_method NOT NULL,
    account_details JSONB NOT NULL DEFAULT 'null'::jsonb,
    notes TEXT,
    status withdrawal_status NOT NULL DEFAULT 'pending',
    requested_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    approved_by UUID,
    reviewed_at TIMESTAMPTZ,
    processed_at TIMESTAMPTZ,
    admin_notes TEXT,
    rejection_reason TEXT,
    CONSTRAINT chk_withdrawal_requests_reviewed CHECK (
        status = 'pending' OR reviewed_at IS NOT NULL
    ),
    CONSTRAINT chk_withdrawal_requests_processed CHECK (
        status <> 'processed' OR processed_at IS NOT NULL
    )
);

-- Admin pending queue
CREATE INDEX idx_withdrawal_requests_status ON withdrawal_requests(status, requested_at DESC);
CREATE INDEX idx_withdrawal_requests_entity ON withdrawal_requests(entity_id, requested_at DESC);
";

const COMMISSION_RATE_OVERRIDES_SQL: &str = r"
CREATE TABLE commission_rate_overrides (
    entity_id UUID PRIMARY KEY REFERENCES balances(entity_id),
    rate NUMERIC(5, 2) NOT NULL CHECK (rate BETWEEN 0 AND 100),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_ledger_transaction_mutation
-- The transaction log is append-only
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_ledger_transaction_mutation()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Ledger transactions are immutable.';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_ledger_transactions_immutable
BEFORE UPDATE OR DELETE ON ledger_transactions
FOR EACH ROW
EXECUTE FUNCTION prevent_ledger_transaction_mutation();

-- ============================================================
-- FUNCTION: prevent_withdrawal_reopen
-- Terminal withdrawal requests never change status again
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_withdrawal_reopen()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status IN ('rejected', 'processed') AND NEW.status <> OLD.status THEN
        RAISE EXCEPTION 'Withdrawal request % is final.', OLD.id;
    END IF;

    IF OLD.status = 'approved' AND NEW.status NOT IN ('approved', 'processed') THEN
        RAISE EXCEPTION 'Approved withdrawal request % can only be processed.', OLD.id;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_withdrawal_requests_status
BEFORE UPDATE ON withdrawal_requests
FOR EACH ROW
EXECUTE FUNCTION prevent_withdrawal_reopen();
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS commission_rate_overrides CASCADE;
DROP TABLE IF EXISTS withdrawal_requests CASCADE;
DROP TABLE IF EXISTS commissions CASCADE;
DROP TABLE IF EXISTS ledger_transactions CASCADE;
DROP TABLE IF EXISTS balances CASCADE;
DROP FUNCTION IF EXISTS prevent_ledger_transaction_mutation();
DROP FUNCTION IF EXISTS prevent_withdrawal_reopen();
DROP TYPE IF EXISTS payment_method;
DROP TYPE IF EXISTS withdrawal_status;
DROP TYPE IF EXISTS commission_status;
DROP TYPE IF EXISTS transaction_type;
DROP TYPE IF EXISTS entity_kind;
";
