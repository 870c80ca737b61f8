//! Initial database migration.
//!
//! Creates the tenants table, every tenant-scoped table, the `updated_at`
//! trigger, and the subdomain lookup function used before a tenant is known.
//!
//! Each scoped table exposes `UNIQUE (tenant_id, id)` and every reference
//! between scoped tables is a composite foreign key on `(tenant_id, ..)`,
//! so a row can never point at another tenant's row.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: TENANTS & ACCOUNTS
        // ============================================================
        db.execute_unprepared(TENANTS_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(STAFF_SQL).await?;

        // ============================================================
        // PART 2: ROOMS & CHILDREN
        // ============================================================
        db.execute_unprepared(ROOMS_SQL).await?;
        db.execute_unprepared(CHILDREN_SQL).await?;

        // ============================================================
        // PART 3: DAILY CARE
        // ============================================================
        db.execute_unprepared(DAILY_LOGS_SQL).await?;
        db.execute_unprepared(ATTENDANCE_SQL).await?;

        // ============================================================
        // PART 4: BILLING
        // ============================================================
        db.execute_unprepared(INVOICES_SQL).await?;
        db.execute_unprepared(PAYMENTS_SQL).await?;

        // ============================================================
        // PART 5: MESSAGING & ANNOUNCEMENTS
        // ============================================================
        db.execute_unprepared(CONVERSATIONS_SQL).await?;
        db.execute_unprepared(MESSAGES_SQL).await?;
        db.execute_unprepared(ANNOUNCEMENTS_SQL).await?;

        // ============================================================
        // PART 6: AUDIT & AUTH TOKENS
        // ============================================================
        db.execute_unprepared(AUDIT_LOGS_SQL).await?;
        db.execute_unprepared(MAGIC_LINK_TOKENS_SQL).await?;

        // ============================================================
        // PART 7: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;
        db.execute_unprepared(TENANT_LOOKUP_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const TENANTS_SQL: &str = r"
CREATE TABLE tenants (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(200) NOT NULL,
    subdomain VARCHAR(63) NOT NULL UNIQUE
        CHECK (subdomain ~ '^[a-z0-9]([a-z0-9-]*[a-z0-9])?$'),
    branding JSONB NOT NULL DEFAULT '{}'::jsonb,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    email VARCHAR(255) NOT NULL,
    full_name VARCHAR(200) NOT NULL,
    role VARCHAR(20) NOT NULL
        CHECK (role IN ('owner', 'admin', 'manager', 'staff', 'parent')),
    password_hash TEXT,
    is_active BOOLEAN NOT NULL DEFAULT true,
    last_login_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, id),
    UNIQUE (tenant_id, email),
    CHECK (role = 'parent' OR password_hash IS NOT NULL)
);
";

const STAFF_SQL: &str = r"
CREATE TABLE staff (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    user_id UUID NOT NULL,
    job_title VARCHAR(100) NOT NULL,
    qualification VARCHAR(100),
    started_on DATE NOT NULL DEFAULT CURRENT_DATE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, id),
    UNIQUE (tenant_id, user_id),
    FOREIGN KEY (tenant_id, user_id) REFERENCES users(tenant_id, id) ON DELETE CASCADE
);
";

const ROOMS_SQL: &str = r"
CREATE TABLE rooms (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    name VARCHAR(100) NOT NULL,
    capacity INTEGER NOT NULL CHECK (capacity > 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, id),
    UNIQUE (tenant_id, name)
);
";

const CHILDREN_SQL: &str = r"
CREATE TABLE children (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    room_id UUID,
    first_name VARCHAR(100) NOT NULL,
    last_name VARCHAR(100) NOT NULL,
    date_of_birth DATE NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, id),
    FOREIGN KEY (tenant_id, room_id) REFERENCES rooms(tenant_id, id)
);

CREATE INDEX idx_children_room ON children(tenant_id, room_id) WHERE is_active = true;
";

const DAILY_LOGS_SQL: &str = r"
CREATE TABLE daily_logs (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    child_id UUID NOT NULL,
    author_id UUID NOT NULL,
    log_date DATE NOT NULL DEFAULT CURRENT_DATE,
    category VARCHAR(20) NOT NULL
        CHECK (category IN ('meal', 'nap', 'nappy', 'activity', 'incident', 'note')),
    details JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, id),
    FOREIGN KEY (tenant_id, child_id) REFERENCES children(tenant_id, id) ON DELETE CASCADE,
    FOREIGN KEY (tenant_id, author_id) REFERENCES users(tenant_id, id)
);

CREATE INDEX idx_daily_logs_child_date ON daily_logs(tenant_id, child_id, log_date);
";

const ATTENDANCE_SQL: &str = r"
CREATE TABLE attendance_records (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    child_id UUID NOT NULL,
    attendance_date DATE NOT NULL DEFAULT CURRENT_DATE,
    checked_in_at TIMESTAMPTZ NOT NULL,
    checked_in_by UUID NOT NULL,
    checked_out_at TIMESTAMPTZ,
    checked_out_by UUID,
    UNIQUE (tenant_id, id),
    UNIQUE (tenant_id, child_id, attendance_date),
    CHECK (checked_out_at IS NULL OR checked_out_at >= checked_in_at),
    FOREIGN KEY (tenant_id, child_id) REFERENCES children(tenant_id, id) ON DELETE CASCADE,
    FOREIGN KEY (tenant_id, checked_in_by) REFERENCES users(tenant_id, id),
    FOREIGN KEY (tenant_id, checked_out_by) REFERENCES users(tenant_id, id)
);
";

const INVOICES_SQL: &str = r"
CREATE TABLE invoices (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    child_id UUID NOT NULL,
    number VARCHAR(40) NOT NULL,
    period_start DATE NOT NULL,
    period_end DATE NOT NULL,
    amount NUMERIC(12, 2) NOT NULL CHECK (amount >= 0),
    currency CHAR(3) NOT NULL DEFAULT 'GBP',
    status VARCHAR(20) NOT NULL DEFAULT 'draft'
        CHECK (status IN ('draft', 'issued', 'paid', 'void')),
    due_on DATE NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, id),
    UNIQUE (tenant_id, number),
    CHECK (period_end >= period_start),
    FOREIGN KEY (tenant_id, child_id) REFERENCES children(tenant_id, id)
);
";

const PAYMENTS_SQL: &str = r"
CREATE TABLE payments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    invoice_id UUID NOT NULL,
    amount NUMERIC(12, 2) NOT NULL CHECK (amount > 0),
    method VARCHAR(20) NOT NULL
        CHECK (method IN ('card', 'bank_transfer', 'cash', 'voucher')),
    reference VARCHAR(100),
    paid_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, id),
    FOREIGN KEY (tenant_id, invoice_id) REFERENCES invoices(tenant_id, id)
);
";

const CONVERSATIONS_SQL: &str = r"
CREATE TABLE conversations (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    subject VARCHAR(200) NOT NULL,
    child_id UUID,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, id),
    FOREIGN KEY (tenant_id, child_id) REFERENCES children(tenant_id, id),
    FOREIGN KEY (tenant_id, created_by) REFERENCES users(tenant_id, id)
);
";

const MESSAGES_SQL: &str = r"
CREATE TABLE messages (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    conversation_id UUID NOT NULL,
    sender_id UUID NOT NULL,
    body TEXT NOT NULL CHECK (length(body) > 0),
    sent_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    read_at TIMESTAMPTZ,
    UNIQUE (tenant_id, id),
    FOREIGN KEY (tenant_id, conversation_id) REFERENCES conversations(tenant_id, id) ON DELETE CASCADE,
    FOREIGN KEY (tenant_id, sender_id) REFERENCES users(tenant_id, id)
);

CREATE INDEX idx_messages_conversation ON messages(tenant_id, conversation_id, sent_at);
";

const ANNOUNCEMENTS_SQL: &str = r"
CREATE TABLE announcements (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    author_id UUID NOT NULL,
    title VARCHAR(200) NOT NULL,
    body TEXT NOT NULL,
    audience VARCHAR(20) NOT NULL DEFAULT 'all'
        CHECK (audience IN ('all', 'staff', 'parents')),
    published_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, id),
    FOREIGN KEY (tenant_id, author_id) REFERENCES users(tenant_id, id)
);
";

const AUDIT_LOGS_SQL: &str = r"
CREATE TABLE audit_logs (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    actor_id UUID,
    action VARCHAR(60) NOT NULL,
    entity_type VARCHAR(60) NOT NULL,
    entity_id UUID,
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    FOREIGN KEY (tenant_id, actor_id) REFERENCES users(tenant_id, id)
);

CREATE INDEX idx_audit_logs_created ON audit_logs(tenant_id, created_at DESC);
";

const MAGIC_LINK_TOKENS_SQL: &str = r"
CREATE TABLE magic_link_tokens (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    user_id UUID NOT NULL,
    token_hash CHAR(64) NOT NULL UNIQUE,
    expires_at TIMESTAMPTZ NOT NULL,
    used_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    FOREIGN KEY (tenant_id, user_id) REFERENCES users(tenant_id, id) ON DELETE CASCADE
);

CREATE INDEX idx_magic_link_tokens_user ON magic_link_tokens(tenant_id, user_id)
    WHERE used_at IS NULL;
";

const TRIGGERS_SQL: &str = r"
CREATE OR REPLACE FUNCTION set_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at := now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_tenants_updated_at BEFORE UPDATE ON tenants
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
CREATE TRIGGER trg_users_updated_at BEFORE UPDATE ON users
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
CREATE TRIGGER trg_children_updated_at BEFORE UPDATE ON children
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
CREATE TRIGGER trg_invoices_updated_at BEFORE UPDATE ON invoices
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
";

// Runs with the owner's rights so a login request can find its tenant before
// any binding exists. It returns only the id of an active tenant.
const TENANT_LOOKUP_SQL: &str = r"
CREATE OR REPLACE FUNCTION tenant_id_for_subdomain(p_subdomain TEXT)
RETURNS UUID
LANGUAGE sql
STABLE
SECURITY DEFINER
SET search_path = public, pg_temp
AS $$
    SELECT id FROM tenants WHERE subdomain = lower(p_subdomain) AND is_active
$$;

REVOKE ALL ON FUNCTION tenant_id_for_subdomain(TEXT) FROM PUBLIC;
";

const DROP_ALL_SQL: &str = r"
DROP FUNCTION IF EXISTS tenant_id_for_subdomain(TEXT);
DROP TABLE IF EXISTS magic_link_tokens;
DROP TABLE IF EXISTS audit_logs;
DROP TABLE IF EXISTS announcements;
DROP TABLE IF EXISTS messages;
DROP TABLE IF EXISTS conversations;
DROP TABLE IF EXISTS payments;
DROP TABLE IF EXISTS invoices;
DROP TABLE IF EXISTS attendance_records;
DROP TABLE IF EXISTS daily_logs;
DROP TABLE IF EXISTS children;
DROP TABLE IF EXISTS rooms;
DROP TABLE IF EXISTS staff;
DROP TABLE IF EXISTS users;
DROP TABLE IF EXISTS tenants;
DROP FUNCTION IF EXISTS set_updated_at();
";
